use thiserror::Error;

/// Errors from the candle ingestion layer (CSV files, feed adapters)
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read candle data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse candle data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("No usable candles in {source_name}")]
    Empty { source_name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_row_formatting() {
        let err = DataError::MalformedRow {
            row: 17,
            reason: "invalid price '1.0.3'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("17"));
        assert!(msg.contains("1.0.3"));
    }

    #[test]
    fn test_empty_formatting() {
        let err = DataError::Empty {
            source_name: "EURUSD_M1.csv".to_string(),
        };
        assert!(err.to_string().contains("EURUSD_M1.csv"));
    }
}
