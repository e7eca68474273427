//! Relation nature classification.
//!
//! The nature of a relation attribute is a pure function of the declared
//! shape on the owner side and the shape of the reciprocal attribute on the
//! other side (which may be absent: one-way, many-way, and morph relations
//! without a declared inverse). The two classifications combine through a
//! fixed lookup table.

use super::model::{RelationDecl, TargetDecl};

/// The closed set of relation natures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationNature {
    /// Single target, no inverse declared anywhere.
    OneWay,
    /// Single target on both sides.
    OneToOne,
    /// Many targets, each pointing back at one owner.
    OneToMany,
    /// Single target, shared by many owners.
    ManyToOne,
    /// Many targets on both sides, linked through a pivot table.
    ManyToMany,
    /// Many targets, no inverse declared anywhere.
    ManyWay,
    /// Single concrete target whose inverse is a single polymorphic slot.
    OneToOneMorph,
    /// Many concrete targets whose inverse is a single polymorphic slot.
    OneToManyMorph,
    /// Single concrete target whose inverse is a polymorphic list.
    ManyToOneMorph,
    /// Many concrete targets whose inverse is a polymorphic list.
    ManyToManyMorph,
    /// A single polymorphic slot pointing at one row of any model.
    OneMorphToOne,
    /// A single polymorphic slot whose inverses are many-valued.
    OneMorphToMany,
    /// A polymorphic list whose inverses are single-valued.
    ManyMorphToOne,
    /// A polymorphic list whose inverses are many-valued.
    ManyMorphToMany,
}

impl RelationNature {
    /// Whether the owner side holds an ordered list of links.
    pub fn is_many_valued(&self) -> bool {
        matches!(
            self,
            RelationNature::OneToMany
                | RelationNature::ManyToMany
                | RelationNature::ManyWay
                | RelationNature::OneToManyMorph
                | RelationNature::ManyToManyMorph
                | RelationNature::ManyMorphToOne
                | RelationNature::ManyMorphToMany
        )
    }

    /// Whether either side of the relation is polymorphic.
    pub fn is_morph(&self) -> bool {
        !matches!(
            self,
            RelationNature::OneWay
                | RelationNature::OneToOne
                | RelationNature::OneToMany
                | RelationNature::ManyToOne
                | RelationNature::ManyToMany
                | RelationNature::ManyWay
        )
    }

    /// Whether the owner side itself is the polymorphic one.
    pub fn owner_is_polymorphic(&self) -> bool {
        matches!(
            self,
            RelationNature::OneMorphToOne
                | RelationNature::OneMorphToMany
                | RelationNature::ManyMorphToOne
                | RelationNature::ManyMorphToMany
        )
    }

    /// Whether the relation goes through a symmetric pivot table.
    pub fn uses_pivot(&self) -> bool {
        matches!(self, RelationNature::ManyToMany | RelationNature::ManyWay)
    }
}

/// Classification of the owner side's declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnerShape {
    /// `model: <name>`.
    Model,
    /// `collection: <name>`.
    Collection,
    /// `model: "*"`.
    MorphToOne,
    /// `collection: "*"`.
    MorphToMany,
}

/// Classification of the reciprocal attribute's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReciprocalShape {
    /// No attribute on any model points back here.
    Absent,
    /// Reciprocal is `model: <owner>`.
    Model,
    /// Reciprocal is `collection: <owner>`.
    Collection,
    /// Reciprocal is `model: "*"`.
    MorphOne,
    /// Reciprocal is `collection: "*"`.
    MorphMany,
}

pub(crate) fn classify_owner(decl: &RelationDecl) -> OwnerShape {
    match decl.target {
        TargetDecl::Model(_) => OwnerShape::Model,
        TargetDecl::Collection(_) => OwnerShape::Collection,
        TargetDecl::AnyModel => OwnerShape::MorphToOne,
        TargetDecl::AnyCollection => OwnerShape::MorphToMany,
    }
}

pub(crate) fn classify_reciprocal(decl: &RelationDecl) -> ReciprocalShape {
    match decl.target {
        TargetDecl::Model(_) => ReciprocalShape::Model,
        TargetDecl::Collection(_) => ReciprocalShape::Collection,
        TargetDecl::AnyModel => ReciprocalShape::MorphOne,
        TargetDecl::AnyCollection => ReciprocalShape::MorphMany,
    }
}

/// Combine both side classifications into a nature.
///
/// Returns `None` for combinations that cannot be classified (for example a
/// polymorphic attribute whose reciprocal is itself polymorphic); the
/// registry turns that into a configuration error at build time.
pub(crate) fn combine(owner: OwnerShape, reciprocal: ReciprocalShape) -> Option<RelationNature> {
    use OwnerShape as O;
    use ReciprocalShape as R;

    match (owner, reciprocal) {
        (O::Model, R::Absent) => Some(RelationNature::OneWay),
        (O::Model, R::Model) => Some(RelationNature::OneToOne),
        (O::Model, R::Collection) => Some(RelationNature::ManyToOne),
        (O::Model, R::MorphOne) => Some(RelationNature::OneToOneMorph),
        (O::Model, R::MorphMany) => Some(RelationNature::ManyToOneMorph),

        (O::Collection, R::Absent) => Some(RelationNature::ManyWay),
        (O::Collection, R::Model) => Some(RelationNature::OneToMany),
        (O::Collection, R::Collection) => Some(RelationNature::ManyToMany),
        (O::Collection, R::MorphOne) => Some(RelationNature::OneToManyMorph),
        (O::Collection, R::MorphMany) => Some(RelationNature::ManyToManyMorph),

        (O::MorphToOne, R::Absent | R::Model) => Some(RelationNature::OneMorphToOne),
        (O::MorphToOne, R::Collection) => Some(RelationNature::OneMorphToMany),

        (O::MorphToMany, R::Model) => Some(RelationNature::ManyMorphToOne),
        (O::MorphToMany, R::Absent | R::Collection) => Some(RelationNature::ManyMorphToMany),

        (O::MorphToOne | O::MorphToMany, R::MorphOne | R::MorphMany) => None,
    }
}
