//! Header row handling for price import files.

use log::{debug, warn};
use std::collections::HashMap;

use crate::error::ImportError;

use super::field_parsers::{normalize_header, split_line};
use super::ImportType;

/// Column positions resolved from the header row
#[derive(Debug, Clone)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
    column_count: usize,
}

impl HeaderMap {
    /// Parses the header line and checks that every column the import type
    /// needs is present. Missing columns are all named in the error.
    pub fn parse(line: &str, delimiter: u8, import_type: ImportType) -> Result<Self, ImportError> {
        let headers = split_line(line, delimiter).map_err(|e| ImportError::UnparseableLine {
            line: 1,
            reason: e.to_string(),
        })?;

        let mut columns = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            columns.entry(normalize_header(header)).or_insert(index);
        }
        debug!("Header columns: {columns:?}");

        let missing: Vec<String> = import_type
            .required_headers()
            .iter()
            .filter(|required| !columns.contains_key(**required))
            .map(|required| required.to_string())
            .collect();

        if !missing.is_empty() {
            warn!("Missing required columns for {import_type:?} import: {missing:?}");
            return Err(ImportError::MissingHeaders(missing));
        }

        Ok(Self {
            columns,
            column_count: headers.len(),
        })
    }

    /// Number of columns in the header row
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Value of a column in a data row, empty when the row is short
    pub fn field<'a>(&self, fields: &'a [String], column: &str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|index| fields.get(*index))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_columns_in_any_order() {
        let header = HeaderMap::parse("Nombre;CONTADO;Código", b';', ImportType::Sale).unwrap();
        let row = vec!["Widget".to_string(), "10".to_string(), "P1".to_string()];

        assert_eq!(header.column_count(), 3);
        assert_eq!(header.field(&row, "codigo"), "P1");
        assert_eq!(header.field(&row, "contado"), "10");
    }

    #[test]
    fn names_every_missing_column() {
        let err = HeaderMap::parse("codigo,nombre", b',', ImportType::Purchase).unwrap_err();
        assert_eq!(
            err,
            ImportError::MissingHeaders(vec![
                "fecha".to_string(),
                "rut".to_string(),
                "precio".to_string()
            ])
        );
        assert!(err.to_string().contains("fecha, rut, precio"));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let header =
            HeaderMap::parse("codigo;nombre;contado;rubro", b';', ImportType::Sale).unwrap();
        assert_eq!(header.column_count(), 4);
    }
}
