//! Spreadsheet export of delivery records

use water_ledger::DeliveryRecord;

/// Byte order mark so spreadsheet tools open the file as UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const HEADERS: [&str; 7] = [
    "Date",
    "Time",
    "Regular Water",
    "Nongfu Water",
    "Total Delivered",
    "Empty Buckets Taken",
    "Remaining Empty Buckets",
];

/// CSV document with one row per record, in the order given. Times are UTC.
pub fn render_csv(records: &[DeliveryRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = UTF8_BOM.to_vec();

    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(HEADERS)?;

        for record in records {
            writer.write_record([
                record.date.to_string(),
                record.timestamp.format("%H:%M:%S").to_string(),
                record.normal_water.to_string(),
                record.nongfu_water.to_string(),
                record.total_delivered.to_string(),
                record.empty_buckets_taken.to_string(),
                record.remaining_empty_buckets.to_string(),
            ])?;
        }
        writer.flush()?;
    }

    Ok(buffer)
}
