//! Model and attribute definitions.

use serde::{Deserialize, Serialize};

/// Scalar attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean.
    Bool,
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// Timestamp.
    DateTime,
    /// Arbitrary JSON document.
    Json,
}

/// The declared target of a relation attribute.
///
/// `model` declares a single-valued side, `collection` a many-valued side.
/// The `"*"` wildcard target means "any model" (genuine polymorphism).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetDecl {
    /// `model: <name>` - single-valued, concrete target.
    Model(String),
    /// `collection: <name>` - many-valued, concrete target.
    Collection(String),
    /// `model: "*"` - single-valued, any model.
    AnyModel,
    /// `collection: "*"` - many-valued, any model.
    AnyCollection,
}

impl TargetDecl {
    /// The concrete target model name, if any.
    pub fn model_name(&self) -> Option<&str> {
        match self {
            TargetDecl::Model(name) | TargetDecl::Collection(name) => Some(name),
            TargetDecl::AnyModel | TargetDecl::AnyCollection => None,
        }
    }

    /// Whether the target is the `"*"` wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TargetDecl::AnyModel | TargetDecl::AnyCollection)
    }

    /// Whether the declared side holds many values.
    pub fn is_many(&self) -> bool {
        matches!(self, TargetDecl::Collection(_) | TargetDecl::AnyCollection)
    }
}

/// The raw declaration of a relation attribute, before nature resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Declared target shape.
    pub target: TargetDecl,
    /// Name of the reciprocal attribute on the target model, if declared.
    pub via: Option<String>,
    /// Which side owns the pivot table naming in a symmetric many-to-many.
    pub dominant: bool,
}

impl RelationDecl {
    /// Single-valued relation to a concrete model.
    pub fn model(target: impl Into<String>) -> Self {
        Self {
            target: TargetDecl::Model(target.into()),
            via: None,
            dominant: false,
        }
    }

    /// Many-valued relation to a concrete model.
    pub fn collection(target: impl Into<String>) -> Self {
        Self {
            target: TargetDecl::Collection(target.into()),
            via: None,
            dominant: false,
        }
    }

    /// Single-valued polymorphic relation (`model: "*"`).
    pub fn any_model() -> Self {
        Self {
            target: TargetDecl::AnyModel,
            via: None,
            dominant: false,
        }
    }

    /// Many-valued polymorphic relation (`collection: "*"`).
    pub fn any_collection() -> Self {
        Self {
            target: TargetDecl::AnyCollection,
            via: None,
            dominant: false,
        }
    }

    /// Set the reciprocal attribute name.
    pub fn via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }

    /// Mark this side as dominant.
    pub fn dominant(mut self) -> Self {
        self.dominant = true;
        self
    }
}

/// The kind of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Plain column.
    Scalar(ScalarType),
    /// Relation to another model.
    Relation(RelationDecl),
    /// Nested component.
    Component {
        /// Component type identifier.
        component: String,
        /// Whether the field holds an ordered list of instances.
        repeatable: bool,
    },
    /// Ordered, heterogeneously-typed sequence of component instances.
    DynamicZone {
        /// Allowed component type identifiers.
        components: Vec<String>,
    },
}

/// One named attribute on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name; doubles as the column name for scalars.
    pub name: String,
    /// Attribute kind.
    pub kind: AttributeKind,
}

impl AttributeDef {
    /// A scalar attribute.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Scalar(scalar),
        }
    }

    /// A relation attribute.
    pub fn relation(name: impl Into<String>, decl: RelationDecl) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Relation(decl),
        }
    }

    /// A single (non-repeatable) component attribute.
    pub fn component(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Component {
                component: component.into(),
                repeatable: false,
            },
        }
    }

    /// A repeatable component attribute.
    pub fn repeatable_component(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Component {
                component: component.into(),
                repeatable: true,
            },
        }
    }

    /// A dynamic zone attribute.
    pub fn dynamic_zone(
        name: impl Into<String>,
        components: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::DynamicZone {
                components: components.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// The relation declaration, if this attribute is a relation.
    pub fn as_relation(&self) -> Option<&RelationDecl> {
        match &self.kind {
            AttributeKind::Relation(decl) => Some(decl),
            _ => None,
        }
    }
}

/// A model definition (content type or component schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name (unique within its namespace).
    pub name: String,
    /// Physical collection (table) name.
    pub collection_name: String,
    /// Primary key column name.
    pub primary_key: String,
    /// Attribute definitions.
    pub attributes: Vec<AttributeDef>,
    /// Whether the draft/publish lifecycle is enabled.
    pub draft_and_publish: bool,
}

impl ModelDef {
    /// Create a model definition with the default `id` primary key.
    pub fn new(name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_name: collection_name.into(),
            primary_key: "id".to_string(),
            attributes: Vec::new(),
            draft_and_publish: false,
        }
    }

    /// Override the primary key column name.
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Enable the draft/publish lifecycle.
    pub fn with_draft_and_publish(mut self) -> Self {
        self.draft_and_publish = true;
        self
    }

    /// Get an attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Iterate the relation attributes.
    pub fn relation_attributes(&self) -> impl Iterator<Item = (&str, &RelationDecl)> {
        self.attributes
            .iter()
            .filter_map(|a| a.as_relation().map(|d| (a.name.as_str(), d)))
    }
}
