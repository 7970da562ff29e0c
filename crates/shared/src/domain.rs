/// Page regions the controller reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayRegion {
    StartButton,
    Status,
    BlinkCount,
}

impl DisplayRegion {
    pub const ALL: [DisplayRegion; 3] = [
        DisplayRegion::StartButton,
        DisplayRegion::Status,
        DisplayRegion::BlinkCount,
    ];

    pub fn element_id(self) -> &'static str {
        match self {
            DisplayRegion::StartButton => crate::protocol::element_ids::START_BUTTON,
            DisplayRegion::Status => crate::protocol::element_ids::STATUS,
            DisplayRegion::BlinkCount => crate::protocol::element_ids::BLINK_COUNT,
        }
    }
}
