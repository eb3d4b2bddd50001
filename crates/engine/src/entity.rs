//! Persisted entities shown in budget tables.
//!
//! Each concrete kind is a flat struct. Shared read behavior is the
//! `TableEntity` capability: an id, field access by key, and child ids for
//! hierarchical rows. Fields an entity does not know return `None`, which the
//! row factories turn into the column's null sentinel.

use budgetgrid_core::{CellValue, ModelId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub trait TableEntity {
    fn id(&self) -> ModelId;

    /// Value of `field`, or `None` when the entity has no value for it.
    fn field(&self, field: &str) -> Option<CellValue>;

    /// Ids of child entities (sub-accounts of an account, ...).
    fn children(&self) -> &[ModelId] {
        &[]
    }
}

fn text(value: &Option<String>) -> Option<CellValue> {
    value.as_ref().map(|s| CellValue::Text(s.clone()))
}

fn number(value: Option<f64>) -> Option<CellValue> {
    value.map(CellValue::Number)
}

fn reference(value: Option<u64>) -> Option<CellValue> {
    value.map(CellValue::Ref)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: ModelId,
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// Sum of the children's estimates, computed server-side.
    pub estimated: f64,
    pub actual: f64,
    #[serde(default)]
    pub children: Vec<ModelId>,
}

impl TableEntity for Account {
    fn id(&self) -> ModelId {
        self.id
    }

    fn field(&self, field: &str) -> Option<CellValue> {
        match field {
            "identifier" => text(&self.identifier),
            "description" => text(&self.description),
            "estimated" => Some(CellValue::Number(self.estimated)),
            "actual" => Some(CellValue::Number(self.actual)),
            "variance" => Some(CellValue::Number(self.estimated - self.actual)),
            _ => None,
        }
    }

    fn children(&self) -> &[ModelId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: ModelId,
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub rate: Option<f64>,
    pub multiplier: Option<f64>,
    pub unit: Option<u64>,
    pub contact: Option<u64>,
    #[serde(default)]
    pub fringes: Vec<u64>,
    pub actual: f64,
    #[serde(default)]
    pub children: Vec<ModelId>,
    /// Estimate rolled up from children; only meaningful when `children` is non-empty.
    pub children_estimated: f64,
}

impl SubAccount {
    /// quantity x rate x multiplier for leaf rows, the children's sum otherwise.
    pub fn estimated(&self) -> f64 {
        if !self.children.is_empty() {
            return self.children_estimated;
        }
        match (self.quantity, self.rate) {
            (Some(q), Some(r)) => q * r * self.multiplier.unwrap_or(1.0),
            _ => 0.0,
        }
    }
}

impl TableEntity for SubAccount {
    fn id(&self) -> ModelId {
        self.id
    }

    fn field(&self, field: &str) -> Option<CellValue> {
        match field {
            "identifier" => text(&self.identifier),
            "description" => text(&self.description),
            "quantity" => number(self.quantity),
            "rate" => number(self.rate),
            "multiplier" => number(self.multiplier),
            "unit" => reference(self.unit),
            "contact" => reference(self.contact),
            "fringes" => Some(CellValue::RefList(self.fringes.clone())),
            "estimated" => Some(CellValue::Number(self.estimated())),
            "actual" => Some(CellValue::Number(self.actual)),
            "variance" => Some(CellValue::Number(self.estimated() - self.actual)),
            _ => None,
        }
    }

    fn children(&self) -> &[ModelId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fringe {
    pub id: ModelId,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Fraction applied to the fringed amount (0.1 = 10%).
    pub rate: Option<f64>,
    pub cutoff: Option<f64>,
    pub unit: Option<u64>,
    pub color: Option<String>,
}

impl TableEntity for Fringe {
    fn id(&self) -> ModelId {
        self.id
    }

    fn field(&self, field: &str) -> Option<CellValue> {
        match field {
            "name" => text(&self.name),
            "description" => text(&self.description),
            "rate" => number(self.rate),
            "cutoff" => number(self.cutoff),
            "unit" => reference(self.unit),
            "color" => text(&self.color),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actual {
    pub id: ModelId,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub contact: Option<u64>,
    pub owner: Option<u64>,
    pub payment_method: Option<u64>,
    pub payment_id: Option<String>,
    pub purchase_order: Option<String>,
    pub notes: Option<String>,
}

impl TableEntity for Actual {
    fn id(&self) -> ModelId {
        self.id
    }

    fn field(&self, field: &str) -> Option<CellValue> {
        match field {
            "name" => text(&self.name),
            "date" => self.date.map(CellValue::Date),
            "value" => number(self.value),
            "contact" => reference(self.contact),
            "owner" => reference(self.owner),
            "payment_method" => reference(self.payment_method),
            "payment_id" => text(&self.payment_id),
            "purchase_order" => text(&self.purchase_order),
            "notes" => text(&self.notes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ModelId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub rate: Option<f64>,
    pub contact_type: Option<u64>,
}

impl Contact {
    /// "First Last", skipping missing parts.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl TableEntity for Contact {
    fn id(&self) -> ModelId {
        self.id
    }

    fn field(&self, field: &str) -> Option<CellValue> {
        match field {
            "names" => self.full_name().map(CellValue::Text),
            "first_name" => text(&self.first_name),
            "last_name" => text(&self.last_name),
            "company" => text(&self.company),
            "position" => text(&self.position),
            "email" => text(&self.email),
            "phone_number" => text(&self.phone_number),
            "rate" => number(self.rate),
            "contact_type" => reference(self.contact_type),
            _ => None,
        }
    }
}
