use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{IgnoredAny, MapAccess, Visitor},
};

/// A single vacancy row. The serde names are the public JSON representation
/// and must stay stable in responses; requests may spell them in any case.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "vacancy")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "ID")]
    pub id: i64,
    #[sea_orm(indexed)]
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Salary")]
    pub salary: i64,
    #[serde(rename = "Experience")]
    pub experience: String,
    #[serde(rename = "City")]
    pub city: String,
}

/// Field names match ASCII case-insensitively, missing fields keep their
/// defaults, unknown fields are skipped and a repeated field keeps its last
/// value.
impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ModelVisitor)
    }
}

struct ModelVisitor;

impl<'de> Visitor<'de> for ModelVisitor {
    type Value = Model;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a vacancy object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Model, A::Error> {
        let mut model = Model::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.to_ascii_lowercase().as_str() {
                "id" => model.id = map.next_value()?,
                "name" => model.name = map.next_value()?,
                "salary" => model.salary = map.next_value()?,
                "experience" => model.experience = map.next_value()?,
                "city" => model.city = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(model)
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}
