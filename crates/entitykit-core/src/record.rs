//! Dynamic entity instances.

use crate::metadata::ResolvedEntity;
use crate::row::Row;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// An instance of a resolved entity.
///
/// Records are plain data: field values keyed by name, plus any populated
/// related records. The session creates them (validated against resolved
/// metadata) and hydrates them from storage rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    values: BTreeMap<String, Value>,
    related: BTreeMap<String, Record>,
}

impl Record {
    /// Create an empty record of the given entity type.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            values: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    /// Hydrate a record from a storage row using resolved metadata.
    ///
    /// Picks up scalar fields, foreign key columns, and computed projections
    /// the row carries. Relations are not populated here; the caller attaches
    /// them after fetching the related rows.
    #[must_use]
    pub fn from_row(entity: &ResolvedEntity, row: &Row) -> Self {
        let mut record = Self::new(entity.name.clone());
        for field in &entity.fields {
            if let Some(value) = row.get_by_name(&field.name) {
                record.set(field.name.clone(), value.clone());
            }
        }
        for relation in &entity.relations {
            if let Some(value) = row.get_by_name(&relation.fk_column) {
                record.set(relation.fk_column.clone(), value.clone());
            }
        }
        for computed in &entity.computed {
            if let Some(value) = row.get_by_name(&computed.name) {
                record.set(computed.name.clone(), value.clone());
            }
        }
        record
    }

    /// The entity type this record belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    /// Iterate over field values in name order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a populated related record.
    pub fn related(&self, relation: &str) -> Option<&Record> {
        self.related.get(relation)
    }

    /// Attach a populated related record.
    pub fn attach(&mut self, relation: impl Into<String>, record: Record) {
        self.related.insert(relation.into(), record);
    }

    /// Whether the relation has been populated.
    pub fn is_populated(&self, relation: &str) -> bool {
        self.related.contains_key(relation)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + self.related.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        for (name, record) in &self.related {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut record = Record::new("User");
        record.set("first_name", "tony");
        record.set("id", 1_i64);
        assert_eq!(record.entity(), "User");
        assert_eq!(record.get("first_name"), Some(&Value::Text("tony".into())));
        assert_eq!(record.get("id"), Some(&Value::BigInt(1)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_related_records() {
        let mut company = Record::new("Company");
        company.set("name", "coca cola");

        let mut user = Record::new("User");
        assert!(!user.is_populated("company"));
        user.attach("company", company);
        assert!(user.is_populated("company"));
        assert_eq!(
            user.related("company").and_then(|c| c.get("name")),
            Some(&Value::Text("coca cola".into()))
        );
    }

    #[test]
    fn test_from_row_picks_up_fields_and_projections() {
        use crate::formula::Formula;
        use crate::metadata::{ResolvedComputed, ResolvedField, ResolvedRelation};
        use crate::types::ColumnType;

        let entity = ResolvedEntity {
            name: "User".to_string(),
            table: "user".to_string(),
            primary_key: "id".to_string(),
            fields: vec![ResolvedField {
                name: "id".to_string(),
                column_type: ColumnType::BigInt,
                nullable: false,
                primary_key: true,
            }],
            computed: vec![ResolvedComputed {
                name: "id_text".to_string(),
                formula: Formula::parse("id").unwrap(),
            }],
            relations: vec![ResolvedRelation {
                name: "company".to_string(),
                target: "Company".to_string(),
                fk_column: "company_id".to_string(),
                nullable: true,
            }],
        };
        let row = Row::new(
            vec![
                "id".to_string(),
                "company_id".to_string(),
                "id_text".to_string(),
            ],
            vec![Value::BigInt(1), Value::BigInt(9), Value::Text("1".into())],
        );
        let record = Record::from_row(&entity, &row);
        assert_eq!(record.get("id"), Some(&Value::BigInt(1)));
        assert_eq!(record.get("company_id"), Some(&Value::BigInt(9)));
        assert_eq!(record.get("id_text"), Some(&Value::Text("1".into())));
        assert!(!record.is_populated("company"));
    }

    #[test]
    fn test_serialize_flattens_fields_and_relations() {
        let mut company = Record::new("Company");
        company.set("name", "coca cola");

        let mut user = Record::new("User");
        user.set("first_name", "tony");
        user.attach("company", company);

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["first_name"], "tony");
        assert_eq!(json["company"]["name"], "coca cola");
    }
}
