use quiz_core::QuizSession;
use quiz_core::model::Lifeline;

/// Aggregated view of session progress, useful for a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based number of the question on screen; equals `total` once finished.
    pub question_number: usize,
    pub total: usize,
    pub score: u32,
    pub lives: u32,
    pub streak: u32,
    pub time_remaining: u32,
    pub lifelines_left: Vec<Lifeline>,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: &QuizSession) -> Self {
        let total = session.questions().len();
        Self {
            question_number: (session.current_index() + 1).min(total),
            total,
            score: session.score(),
            lives: session.lives(),
            streak: session.streak(),
            time_remaining: session.time_remaining(),
            lifelines_left: session.lifelines_used().remaining(),
            is_complete: session.is_finished(),
        }
    }
}
