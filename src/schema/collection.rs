use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database_error::DatabaseError;

/// The attribute vocabulary callers register collections with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Text,
    MediumText,
    LongText,
    #[serde(alias = "int")]
    Integer,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Json,
    Array,
    Binary,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    #[serde(skip, default)]
    pub name: String,
    #[serde(rename = "type")]
    pub typ: AttributeType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub size: Option<u32>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, typ: AttributeType) -> Self {
        Self {
            name: name.into(),
            typ,
            primary_key: false,
            auto_increment: false,
            unique: false,
            required: false,
            index: false,
            size: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// One registered collection: a table name plus its attribute definitions, in
/// registration order. Immutable after registration except through an explicit
/// `define`.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub table_name: String,
    pub attributes: Vec<AttributeDefinition>,
}

impl Collection {
    pub fn new(table_name: impl Into<String>, attributes: Vec<AttributeDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            attributes,
        }
    }

    /// Parse the wire form: `{attrName: {type, primaryKey?, ...}}`.
    pub fn from_definition(
        table_name: impl Into<String>,
        definition: &Value,
    ) -> Result<Collection, DatabaseError> {
        let object = definition.as_object().ok_or_else(|| {
            DatabaseError::Criteria("collection definition must be an object".into())
        })?;

        let attributes = object
            .iter()
            .map(|(name, attribute)| {
                let mut parsed: AttributeDefinition = serde_json::from_value(attribute.clone())
                    .map_err(|e| {
                        DatabaseError::Criteria(format!("invalid attribute `{name}`: {e}"))
                    })?;
                parsed.name = name.clone();
                Ok(parsed)
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        Ok(Collection::new(table_name, attributes))
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// The primary-key attribute name; collections registered without an
    /// explicit primary key fall back to the conventional `id`.
    pub fn primary_key(&self) -> &str {
        self.attributes
            .iter()
            .find(|attribute| attribute.primary_key)
            .map(|attribute| attribute.name.as_str())
            .unwrap_or("id")
    }

    pub fn auto_increment_pk(&self) -> bool {
        self.attributes
            .iter()
            .any(|attribute| attribute.primary_key && attribute.auto_increment)
    }
}
