//! Per-run download state for resolved tracks

/// Where a track stands within the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Settlement {
    #[default]
    Pending,
    Downloaded,
    /// A non-empty file was already on disk
    Skipped,
    Failed,
}

/// Mutable run state for one track
#[derive(Debug, Clone, Default)]
pub struct TrackState {
    pub settlement: Settlement,
    /// Last error seen while processing the track
    pub error: Option<String>,
    /// Download link for the attempt in progress; links are single-use
    pub link: Option<String>,
    pub attempts: u32,
}

/// Snapshot of how many tracks have settled which way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackCounts {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TrackCounts {
    /// Counts for a run that has not settled any track yet
    pub fn reset(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn settled(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    /// Share of settled tracks, 0-100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (100 * self.settled().min(self.total) / self.total) as u8
    }
}

/// Run state of every resolved track, indexed by position in the resolved list
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    states: Vec<TrackState>,
}

impl RunLedger {
    pub fn new(track_count: usize) -> Self {
        Self {
            states: vec![TrackState::default(); track_count],
        }
    }

    pub fn get(&self, index: usize) -> Option<&TrackState> {
        self.states.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TrackState> {
        self.states.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackState> {
        self.states.iter()
    }

    pub fn counts(&self) -> TrackCounts {
        let mut counts = TrackCounts::reset(self.states.len());
        for state in &self.states {
            match state.settlement {
                Settlement::Downloaded => counts.downloaded += 1,
                Settlement::Skipped => counts.skipped += 1,
                Settlement::Failed => counts.failed += 1,
                Settlement::Pending => {}
            }
        }
        counts
    }
}
