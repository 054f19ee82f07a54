// Code generated by daogen-build. DO NOT EDIT.

use daogen::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct User {
    #[serde(rename = "id")]
    #[daogen(tag = "id")]
    pub ID: i64,
    #[serde(rename = "name")]
    #[daogen(tag = "name")]
    pub Name: String,
}
