//! Per-node annotation bag.
//!
//! Every node carries a `Vec<Annotation>`. [`Annotation`] is a closed set of
//! kinds, each of which may occur zero or more times on the same node.
//! Confidences belong to the branch above the node and move with it when a
//! tree is rerooted; all other kinds stay with their node.

use std::fmt;

/// Support value for the branch leading to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Confidence {
    pub value: f64,
    /// Kind of support, e.g. `bootstrap` or `posterior`
    pub kind: String,
    pub std_dev: Option<f64>,
}

impl Confidence {
    pub fn new<S: Into<String>>(value: f64, kind: S) -> Self {
        Confidence {
            value,
            kind: kind.into(),
            std_dev: None,
        }
    }

    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = Some(std_dev);
        self
    }
}

/// Taxonomic record. Which field identifies a species is decided by
/// reconciliation, see [`crate::sdi::SpeciesField`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Taxonomy {
    pub identifier: Option<String>,
    pub code: Option<String>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
}

impl Taxonomy {
    /// Taxonomy known only by its code (e.g. `HUMAN`).
    pub fn from_code<S: Into<String>>(code: S) -> Self {
        Taxonomy {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn from_scientific_name<S: Into<String>>(name: S) -> Self {
        Taxonomy {
            scientific_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        non_empty(&self.identifier).is_none()
            && non_empty(&self.code).is_none()
            && non_empty(&self.scientific_name).is_none()
            && non_empty(&self.common_name).is_none()
    }
}

/// Returns the value if it is set and not the empty string.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub accession: Option<String>,
    pub molecular_sequence: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Binary characters (e.g. protein domains) present, gained and lost on a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryCharacters {
    pub present: Vec<String>,
    pub gained: Vec<String>,
    pub lost: Vec<String>,
}

/// Categorical view of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Speciation,
    Duplication,
    SpeciationOrDuplication,
    Other,
}

/// Evolutionary event inferred for an internal node by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Event {
    pub duplications: u32,
    pub speciations: u32,
    pub gene_losses: u32,
}

impl Event {
    pub fn single_duplication() -> Self {
        Event {
            duplications: 1,
            ..Default::default()
        }
    }

    pub fn single_speciation() -> Self {
        Event {
            speciations: 1,
            ..Default::default()
        }
    }

    /// Undecided between speciation and duplication.
    pub fn speciation_or_duplication() -> Self {
        Event {
            duplications: 1,
            speciations: 1,
            gene_losses: 0,
        }
    }

    pub fn event_type(&self) -> EventType {
        match (self.duplications, self.speciations, self.gene_losses) {
            (1, 0, 0) => EventType::Duplication,
            (0, 1, 0) => EventType::Speciation,
            (1, 1, 0) => EventType::SpeciationOrDuplication,
            _ => EventType::Other,
        }
    }

    pub fn is_duplication(&self) -> bool {
        self.event_type() == EventType::Duplication
    }

    pub fn is_speciation(&self) -> bool {
        self.event_type() == EventType::Speciation
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.event_type() {
            EventType::Duplication => f.write_str("duplication"),
            EventType::Speciation => f.write_str("speciation"),
            EventType::SpeciationOrDuplication => f.write_str("speciation_or_duplication"),
            EventType::Other => write!(
                f,
                "duplications={} speciations={} losses={}",
                self.duplications, self.speciations, self.gene_losses
            ),
        }
    }
}

/// One entry of a node's annotation bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Confidence(Confidence),
    Taxonomy(Taxonomy),
    Sequence(Sequence),
    Event(Event),
    Distribution(Distribution),
    BinaryCharacters(BinaryCharacters),
}

impl Annotation {
    /// Whether this annotation describes the branch above the node rather than the node.
    pub fn is_branch_data(&self) -> bool {
        matches!(self, Annotation::Confidence(_))
    }
}
