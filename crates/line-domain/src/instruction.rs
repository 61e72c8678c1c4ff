//! Instrucción de un step: plantilla libre con marcadores `result[NOMBRE]` o
//! lista ordenada de campos de formulario.
//!
//! Ambas variantes exponen los mismos encabezados:
//! - `output_headers`: nombres distintos ordenados lexicográficamente.
//! - `declared_headers`: nombres en el orden declarado. La plantilla da cada
//!   nombre una vez, en orden de primera aparición; el formulario da sus
//!   etiquetas tal cual. Es lo que el step siguiente recibe como entrada.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Un nombre no puede contener espacios ni `]`.
static RESULT_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"result\[([^\]\s]*)\]").expect("placeholder regex"));

/// Tipo de control de un campo de formulario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    TextArea,
    Number,
    Select,
    Radio,
    Checkbox,
}

/// Campo nombrado de una instrucción `FormFields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub id: Uuid,
    pub label: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub validation_format: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl FormField {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self { id: Uuid::new_v4(),
               label: label.into(),
               field_type,
               required: false,
               default_value: None,
               validation_format: None,
               options: Vec::new() }
    }

    /// Atajo para un campo de texto.
    pub fn text(label: impl Into<String>) -> Self {
        Self::new(label, FieldType::Text)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Copia sólo los campos de dominio; la copia recibe identidad nueva.
    pub fn duplicate(&self) -> Self {
        Self { id: Uuid::new_v4(),
               label: self.label.clone(),
               field_type: self.field_type,
               required: self.required,
               default_value: self.default_value.clone(),
               validation_format: self.validation_format.clone(),
               options: self.options.clone() }
    }
}

/// Definición de entradas/salidas esperadas de un step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    RawTemplate { template: String },
    FormFields { fields: Vec<FormField> },
}

impl Instruction {
    pub fn raw(template: impl Into<String>) -> Self {
        Instruction::RawTemplate { template: template.into() }
    }

    pub fn form(fields: Vec<FormField>) -> Self {
        Instruction::FormFields { fields }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Instruction::RawTemplate { .. })
    }

    /// Encabezados de salida: distintos y ordenados lexicográficamente.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.declared_headers();
        headers.sort();
        headers.dedup();
        headers
    }

    /// Encabezados en el orden declarado. Las etiquetas de un formulario se
    /// devuelven tal cual, repetidas incluidas.
    pub fn declared_headers(&self) -> Vec<String> {
        match self {
            Instruction::RawTemplate { template } => placeholders(template),
            Instruction::FormFields { fields } => fields.iter().map(|f| f.label.clone()).collect(),
        }
    }

    /// Una plantilla es utilizable si no está en blanco; una lista de campos
    /// si no está vacía y todos los campos tienen etiqueta.
    pub fn is_complete(&self) -> bool {
        match self {
            Instruction::RawTemplate { template } => !template.trim().is_empty(),
            Instruction::FormFields { fields } => {
                !fields.is_empty() && fields.iter().all(|f| !f.label.trim().is_empty())
            }
        }
    }

    /// Copia de valor: los campos se duplican con identidad nueva.
    pub fn duplicate(&self) -> Self {
        match self {
            Instruction::RawTemplate { template } => Instruction::raw(template.clone()),
            Instruction::FormFields { fields } => Instruction::form(fields.iter().map(FormField::duplicate).collect()),
        }
    }
}

/// Nombres capturados por `result[NOMBRE]` en orden de primera aparición.
pub fn placeholders(template: &str) -> Vec<String> {
    distinct(RESULT_PLACEHOLDER.captures_iter(template)
                               .filter_map(|c| c.get(1))
                               .map(|m| m.as_str().to_string()))
}

fn distinct(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.filter(|n| !n.is_empty() && seen.insert(n.clone())).collect()
}
