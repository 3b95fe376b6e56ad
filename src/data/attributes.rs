use serde::Deserialize;
use std::collections::HashMap;

use crate::data::DataError;

/// Demographic attributes of one municipality
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MunicipalityAttributes {
    #[serde(default)]
    pub id: Option<u64>,
    /// Unique name, join key to the boundary features
    #[serde(rename = "nombre_municipio")]
    pub identifier: String,
    pub region: String,
    #[serde(rename = "nombre_cabecera")]
    pub seat_name: String,
    #[serde(rename = "poblacion_h")]
    pub population_male: u64,
    #[serde(rename = "poblacion_m")]
    pub population_female: u64,
    #[serde(rename = "edad_h")]
    pub avg_age_male: f64,
    #[serde(rename = "edad_m")]
    pub avg_age_female: f64,
    #[serde(rename = "viviendas_hab")]
    pub occupied_dwellings: u64,
}

impl MunicipalityAttributes {
    fn validate(&self) -> Result<(), DataError> {
        for (field, value) in [("edad_h", self.avg_age_male), ("edad_m", self.avg_age_female)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DataError::InvalidValue {
                    municipality: self.identifier.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Attribute rows in source order, indexed by identifier
#[derive(Debug, Default)]
pub struct AttributeTable {
    rows: Vec<MunicipalityAttributes>,
    index: HashMap<String, usize>,
}

impl AttributeTable {
    /// Build the table, rejecting repeated identifiers and invalid values
    pub fn from_rows(rows: Vec<MunicipalityAttributes>) -> Result<Self, DataError> {
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            row.validate()?;
            if index.insert(row.identifier.clone(), pos).is_some() {
                return Err(DataError::DuplicateMunicipality(row.identifier.clone()));
            }
        }
        Ok(Self { rows, index })
    }

    /// Parse a JSON array of rows. The buffer is used as scratch space by the parser.
    pub fn from_json_slice(bytes: &mut [u8]) -> Result<Self, DataError> {
        let rows: Vec<MunicipalityAttributes> = simd_json::serde::from_slice(bytes)?;
        Self::from_rows(rows)
    }

    pub fn lookup(&self, identifier: &str) -> Option<&MunicipalityAttributes> {
        self.index.get(identifier).map(|&pos| &self.rows[pos])
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Position of a municipality in source order
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    pub fn rows(&self) -> &[MunicipalityAttributes] {
        &self.rows
    }

    /// Identifiers in source order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.identifier.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
