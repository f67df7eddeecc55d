use rockwatch_alert::FacilityDirectory;
use rockwatch_common::types::Facility;

/// Facilities listed in the configuration file, in file order.
pub struct StaticFacilityDirectory {
    facilities: Vec<Facility>,
}

impl StaticFacilityDirectory {
    pub fn new(facilities: Vec<Facility>) -> Self {
        Self { facilities }
    }
}

impl FacilityDirectory for StaticFacilityDirectory {
    fn list(&self) -> Vec<Facility> {
        self.facilities.clone()
    }

    fn get(&self, id: &str) -> Option<Facility> {
        self.facilities.iter().find(|f| f.id == id).cloned()
    }
}
