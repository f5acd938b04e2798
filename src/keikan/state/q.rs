/// Queue family ids able to draw and to present to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct families, graphics first.
    pub fn unique(&self) -> Vec<u32> {
        let mut families: Vec<u32> = self
            .graphics_family
            .iter()
            .chain(self.present_family.iter())
            .copied()
            .collect();
        families.dedup();
        families
    }
}
