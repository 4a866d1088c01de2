// src/ingest/csv_reader.rs
// DOCUMENTATION: Minimal RFC 4180 reader for admin uploads
// PURPOSE: Split CSV text into a header and data records

/// One data record with its 1-based data row number
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub row: usize,
    pub cells: Vec<String>,
}

/// Parsed CSV document
#[derive(Debug, Clone)]
pub struct CsvTable {
    /// Header names, trimmed and lowercased
    pub headers: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl CsvTable {
    /// Position of a column by any of its accepted names
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h == n))
    }
}

/// Parse CSV text
/// DOCUMENTATION: Supports quoted fields containing commas, newlines and
/// doubled quotes; LF and CRLF endings; a leading UTF-8 BOM.
/// Fully blank lines are skipped and do not count as rows.
pub fn parse_csv(input: &str) -> Result<CsvTable, String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut raw_records = split_records(input)?
        .into_iter()
        .filter(|cells| !cells.iter().all(|c| c.trim().is_empty()));

    let Some(header_cells) = raw_records.next() else {
        return Err("CSV file is empty".to_string());
    };

    let headers: Vec<String> = header_cells
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let records = raw_records
        .enumerate()
        .map(|(idx, cells)| CsvRecord { row: idx + 1, cells })
        .collect();

    Ok(CsvTable { headers, records })
}

fn split_records(input: &str) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut quote_opened_at = 0usize;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quote_opened_at = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(format!(
            "unterminated quoted field starting on line {}",
            quote_opened_at
        ));
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
