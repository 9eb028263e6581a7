mod invoice_world;
mod setups;
mod steps;

pub use invoice_world::InvoiceWorld;
