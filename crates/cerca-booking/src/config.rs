//! Booking configuration.

/// Configuration for the booking service.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Durations a professional may approve, in minutes.
    pub allowed_durations: Vec<u32>,
    /// Quick-review tags offered to the client after a finished service.
    pub review_tags: Vec<String>,
    /// Maximum length of the provider note, in characters.
    pub max_note_chars: usize,
    /// Maximum length of the client comment, in characters.
    pub max_comment_chars: usize,
    /// Maximum length of the agreed location, in characters.
    pub max_location_chars: usize,
    /// Upper bound for a page of a user's request history.
    pub max_list_limit: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            allowed_durations: vec![30, 60, 90, 120],
            review_tags: vec![
                "#Puntual".into(),
                "#IgualALaFoto".into(),
                "#Discrecion".into(),
            ],
            max_note_chars: 500,
            max_comment_chars: 500,
            max_location_chars: 200,
            max_list_limit: 100,
        }
    }
}

impl BookingConfig {
    pub fn is_allowed_duration(&self, minutes: u32) -> bool {
        self.allowed_durations.contains(&minutes)
    }

    pub fn is_known_tag(&self, tag: &str) -> bool {
        self.review_tags.iter().any(|t| t == tag)
    }
}
