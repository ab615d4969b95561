//! The crane question pool shipped with the game.

use crate::model::{Question, QuestionError, QuestionId};

const BUILTIN: &[(&str, [&str; 4], usize)] = &[
    (
        "Which color is used for errors in Crane Game?",
        ["Red", "Green", "Blue", "Yellow"],
        0,
    ),
    (
        "Crane moves in which direction?",
        ["Up/Down", "Left/Right", "Both", "None"],
        2,
    ),
    (
        "What decreases when you miss an error?",
        ["Score", "Lives", "Coins", "Speed"],
        1,
    ),
    (
        "Which shape is used for errors in the demo?",
        ["Square", "Circle", "Triangle", "Hexagon"],
        0,
    ),
    (
        "What happens on collision with an error?",
        ["Score +1", "Life -1", "Nothing", "Level Up"],
        0,
    ),
    (
        "What lifeline removes two wrong options?",
        ["Skip", "50-50", "ExtraTime", "Double"],
        1,
    ),
    (
        "Where are scores saved?",
        ["Local", "MongoDB", "Cookies", "None"],
        1,
    ),
    (
        "Best practice to avoid crane overload?",
        ["Ignore", "Check weight", "Overload", "Rush"],
        1,
    ),
    (
        "Streak increases when you ...",
        ["Skip", "Answer correct", "Close tab", "Refresh"],
        1,
    ),
    (
        "Which page shows top players?",
        ["Profile", "Leaderboard", "Settings", "Home"],
        1,
    ),
];

/// The built-in pool, ids `1..=10`.
///
/// # Errors
///
/// Returns `QuestionError` only if the embedded table is malformed.
pub fn builtin_questions() -> Result<Vec<Question>, QuestionError> {
    BUILTIN
        .iter()
        .zip(1_u64..)
        .map(|((text, options, correct), id)| {
            Question::new(
                QuestionId::number(id),
                *text,
                options.iter().map(|o| (*o).to_owned()).collect(),
                *correct,
            )
        })
        .collect()
}
