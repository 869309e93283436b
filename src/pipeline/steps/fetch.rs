use crate::app::ports::HttpClientPort;
use crate::error::FetchError;
use crate::types::{Record, Table, Value};
use csv::ReaderBuilder;
use tracing::{debug, info};

/// Downloads `url` once and parses the body as CSV with a header row.
pub async fn fetch_table(http: &dyn HttpClientPort, url: &str) -> Result<Table, FetchError> {
    info!("Fetching {}", url);
    let resp = http.get(url).await.map_err(FetchError::Transport)?;
    if !resp.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: resp.status,
        });
    }
    debug!("Received {} bytes from {}", resp.bytes.len(), url);
    parse_csv(&resp.bytes)
}

/// Parses CSV text into a table keyed by the header row. Blank lines are skipped.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, FetchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    for (idx, column) in header.iter().enumerate() {
        if header[..idx].contains(column) {
            return Err(FetchError::DuplicateColumn(column.clone()));
        }
    }

    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        if row.len() != header.len() {
            return Err(FetchError::InconsistentRow {
                line: row.position().map(|p| p.line()).unwrap_or_default(),
                expected: header.len(),
                found: row.len(),
            });
        }
        let record = Record::from_pairs(
            header
                .iter()
                .zip(row.iter())
                .map(|(column, field)| (column.clone(), Value::text(field))),
        );
        records.push(record);
    }

    Table::with_columns(header, records).map_err(|e| FetchError::InconsistentHeader(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use async_trait::async_trait;

    struct CannedHttp {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClientPort for CannedHttp {
        async fn get(&self, _url: &str) -> Result<HttpGetResult, String> {
            Ok(HttpGetResult {
                status: self.status,
                bytes: self.body.as_bytes().to_vec(),
            })
        }
    }

    struct BrokenHttp;

    #[async_trait]
    impl HttpClientPort for BrokenHttp {
        async fn get(&self, _url: &str) -> Result<HttpGetResult, String> {
            Err("connection refused".to_string())
        }
    }

    #[test]
    fn test_parse_csv_uses_header_for_every_row() {
        let table = parse_csv(b"name,calories,cups\r\nA,100,1\r\nB,150,0.5\r\n\r\n").unwrap();
        assert_eq!(table.columns(), &["name", "calories", "cups"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].get("calories"), Some(&Value::text("150")));
    }

    #[test]
    fn test_parse_csv_header_only() {
        let table = parse_csv(b"name,calories\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn test_parse_csv_rejects_ragged_rows() {
        let err = parse_csv(b"name,calories\nA,100\nB\n").unwrap_err();
        match err {
            FetchError::InconsistentRow { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_csv_rejects_repeated_header() {
        let err = parse_csv(b"name,calories,calories\nA,100,5\nB,150,6\n").unwrap_err();
        assert!(matches!(err, FetchError::DuplicateColumn(ref column) if column == "calories"));
    }

    #[tokio::test]
    async fn test_fetch_table_rejects_error_status() {
        let http = CannedHttp { status: 404, body: "not found" };
        let err = fetch_table(&http, "http://example.test/cereal.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_table_surfaces_transport_errors() {
        let err = fetch_table(&BrokenHttp, "http://example.test/cereal.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(ref msg) if msg == "connection refused"));
    }
}
