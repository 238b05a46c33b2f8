pub mod movement;
pub mod tank;

pub use movement::{Entity as Movement, MovementType};
pub use tank::{Entity as Tank, TankStatus};
