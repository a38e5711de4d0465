//! Per-activity render projection shared by every surface.

use shared::domain::Directory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityCard {
    pub name: String,
    pub description: String,
    pub schedule: String,
    pub spots_left: i64,
    pub participants: Vec<String>,
}

impl ActivityCard {
    pub fn from_directory(directory: &Directory) -> Vec<Self> {
        directory
            .iter()
            .map(|(name, details)| Self {
                name: name.clone(),
                description: details.description.clone(),
                schedule: details.schedule.clone(),
                spots_left: details.spots_left(),
                participants: details.participants.clone(),
            })
            .collect()
    }
}
