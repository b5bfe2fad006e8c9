/// Write side of the split board: one time field per segment plus the run
/// total. Writes are fire-and-forget; an out-of-range index is ignored.
pub trait DisplaySink {
    fn set_segment_time(&mut self, index: usize, text: &str);
    fn set_total_time(&mut self, text: &str);

    /// Blank the first `segment_count` segment fields and the total.
    fn blank(&mut self, segment_count: usize) {
        for index in 0..segment_count {
            self.set_segment_time(index, "");
        }
        self.set_total_time("");
    }
}

/// Display model rendered by the overlay. An empty string means "blank".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub segment_times: Vec<String>,
    pub total: String,
}

impl Board {
    /// One blank field per segment.
    pub fn new(segment_count: usize) -> Self {
        Self {
            segment_times: vec![String::new(); segment_count],
            total: String::new(),
        }
    }

    /// Board pre-filled with previously recorded times (e.g. from the ledger).
    pub fn with_times<I, S>(times: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segment_times: times.into_iter().map(Into::into).collect(),
            total: String::new(),
        }
    }
}

impl DisplaySink for Board {
    fn set_segment_time(&mut self, index: usize, text: &str) {
        if let Some(field) = self.segment_times.get_mut(index) {
            field.clear();
            field.push_str(text);
        }
    }

    fn set_total_time(&mut self, text: &str) {
        self.total.clear();
        self.total.push_str(text);
    }
}
