//! Escaped HTML fragments for embedding the directory in a page.
//!
//! Every user-supplied string (activity name, description, schedule,
//! participant email) passes through the askama HTML escaper, which covers
//! `&`, `<`, `>`, `"` and `'`.

use askama::Template;

use crate::view::ActivityCard;

#[derive(Template)]
#[template(path = "activity_cards.html")]
struct ActivityCardsTemplate<'a> {
    cards: &'a [ActivityCard],
}

#[derive(Template)]
#[template(path = "activity_options.html")]
struct ActivityOptionsTemplate<'a> {
    names: Vec<&'a str>,
}

/// One `activity-card` block per activity, with a removal control per
/// participant row.
pub fn render_activity_cards(cards: &[ActivityCard]) -> Result<String, askama::Error> {
    ActivityCardsTemplate { cards }.render()
}

/// Options for the activity selection control, led by a placeholder entry.
pub fn render_activity_options(cards: &[ActivityCard]) -> Result<String, askama::Error> {
    ActivityOptionsTemplate {
        names: cards.iter().map(|card| card.name.as_str()).collect(),
    }
    .render()
}
