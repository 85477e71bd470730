//! Input rules for the back-office catalog forms.

use crate::{
    error::AppError,
    models::{Category, CategoryInput, CategoryRequest, GameRequest},
};

const NUMERIC_SLUG_PREFIX: &str = "category-";

/// slugify
///
/// Lowercases, turns whitespace runs into `-` and drops anything outside
/// `[a-z0-9-]`. An all-digit slug gets the `category-` prefix so it can never be
/// mistaken for an id.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }

    if !slug.is_empty() && slug.chars().all(|c| c.is_ascii_digit()) {
        format!("{NUMERIC_SLUG_PREFIX}{slug}")
    } else {
        slug
    }
}

/// Normalizes a game form. Title and game URL are required; blank optionals
/// become `None`.
pub fn validate_game(mut req: GameRequest) -> Result<GameRequest, AppError> {
    req.title = req.title.trim().to_string();
    req.game_url = req.game_url.trim().to_string();

    if req.title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    if req.game_url.is_empty() {
        return Err(AppError::Validation("game_url is required".to_string()));
    }

    req.description = non_blank(req.description);
    req.cover_url = non_blank(req.cover_url);
    Ok(req)
}

pub fn validate_category(req: CategoryRequest) -> Result<CategoryInput, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let slug = match non_blank(req.slug) {
        Some(slug) => slug,
        None => slugify(&name),
    };
    if slug.is_empty() {
        return Err(AppError::Validation(
            "slug is required when the name has no usable characters".to_string(),
        ));
    }

    Ok(CategoryInput { name, slug })
}

/// A category can only be deleted once no game references it.
pub fn ensure_deletable(category: &Category) -> Result<(), AppError> {
    if category.games_count > 0 {
        return Err(AppError::Conflict(format!(
            "category '{}' still has {} game(s); move or delete them first",
            category.name, category.games_count
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
