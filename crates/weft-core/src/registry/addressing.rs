//! Physical addressing for relation storage.
//!
//! Every function here is a pure function of the declared shapes, so both
//! ends of a bidirectional relation compute identical table and column
//! names independently.

use heck::ToSnakeCase;

/// Column holding the draft/publish timestamp on enabled models.
pub const PUBLISHED_AT_COLUMN: &str = "published_at";

/// Morph table column holding the linked row's primary key.
pub const MORPH_RELATED_ID_COLUMN: &str = "related_id";

/// Morph table column holding the linked row's collection discriminator.
pub const MORPH_RELATED_TYPE_COLUMN: &str = "related_type";

/// Morph table column naming the owning attribute.
///
/// One shared morph table serves every polymorphic attribute of an owner
/// model; the field column disambiguates them.
pub const MORPH_FIELD_COLUMN: &str = "field";

/// Morph table column holding the display order.
pub const MORPH_ORDER_COLUMN: &str = "order";

/// Component join table column holding the component row's primary key.
pub const COMPONENT_ID_COLUMN: &str = "component_id";

/// Component join table column holding the component type discriminator.
pub const COMPONENT_TYPE_COLUMN: &str = "component_type";

/// Component join table column naming the owning attribute.
pub const COMPONENT_FIELD_COLUMN: &str = "field";

/// Component join table column holding the display order.
pub const COMPONENT_ORDER_COLUMN: &str = "order";

/// One side of a prospective pivot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotSide<'a> {
    /// Collection (table) name of the side.
    pub collection: &'a str,
    /// Whether this side is declared dominant.
    pub dominant: bool,
}

impl<'a> PivotSide<'a> {
    /// Describe one side.
    pub fn new(collection: &'a str, dominant: bool) -> Self {
        Self {
            collection,
            dominant,
        }
    }
}

fn plural(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

fn singular(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}

/// Pivot table name for a symmetric many-to-many relation.
///
/// The pluralized, snake-cased collection names of both sides are joined
/// with the dominant side last (lexicographic tiebreak), so the result does
/// not depend on which side asks.
pub fn pivot_table_name(a: PivotSide<'_>, b: PivotSide<'_>) -> String {
    let name_a = plural(&a.collection.to_snake_case());
    let name_b = plural(&b.collection.to_snake_case());

    // dominant side sorts last; ties break lexicographically
    let (first, second) = match (a.dominant, b.dominant) {
        (false, true) => (name_a, name_b),
        (true, false) => (name_b, name_a),
        _ => {
            if name_a <= name_b {
                (name_a, name_b)
            } else {
                (name_b, name_a)
            }
        }
    };

    format!("{first}__{second}")
}

/// Pivot table name for a many-way relation (no declared inverse).
pub fn many_way_table_name(owner_collection: &str, field: &str) -> String {
    format!(
        "{}__{}",
        owner_collection.to_snake_case(),
        field.to_snake_case()
    )
}

/// Shared morph table name for a polymorphic owner model.
pub fn morph_table_name(owner_collection: &str) -> String {
    format!("{}_morph", owner_collection.to_snake_case())
}

/// Component join table name for an owner model.
pub fn component_table_name(owner_collection: &str) -> String {
    format!("{}_components", owner_collection.to_snake_case())
}

/// Foreign key column name derived from a model name and its primary key.
pub fn fk_column(model_name: &str, primary_key: &str) -> String {
    format!("{}_{}", singular(&model_name.to_snake_case()), primary_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_name_is_order_independent() {
        let articles = PivotSide::new("articles", true);
        let tags = PivotSide::new("tags", false);

        let from_articles = pivot_table_name(articles, tags);
        let from_tags = pivot_table_name(tags, articles);

        assert_eq!(from_articles, from_tags);
        assert_eq!(from_articles, "tags__articles");
    }

    #[test]
    fn test_pivot_name_lexicographic_tiebreak() {
        let a = PivotSide::new("writers", false);
        let b = PivotSide::new("books", false);

        assert_eq!(pivot_table_name(a, b), "books__writers");
        assert_eq!(pivot_table_name(b, a), "books__writers");
    }

    #[test]
    fn test_pivot_name_pluralizes() {
        let a = PivotSide::new("article", false);
        let b = PivotSide::new("tag", true);
        assert_eq!(pivot_table_name(a, b), "articles__tags");
    }

    #[test]
    fn test_many_way_table_name() {
        assert_eq!(
            many_way_table_name("articles", "relatedArticles"),
            "articles__related_articles"
        );
    }

    #[test]
    fn test_morph_and_component_table_names() {
        assert_eq!(morph_table_name("articles"), "articles_morph");
        assert_eq!(component_table_name("articles"), "articles_components");
    }

    #[test]
    fn test_fk_column_singularizes() {
        assert_eq!(fk_column("articles", "id"), "article_id");
        assert_eq!(fk_column("category", "id"), "category_id");
        assert_eq!(fk_column("AuthorProfile", "id"), "author_profile_id");
    }
}
