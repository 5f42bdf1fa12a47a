pub mod port_assignments;
pub mod port_reservations;
pub mod running_containers;
