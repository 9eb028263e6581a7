use cucumber::given;

use crate::cucumber::{invoice_world::InvoiceSystem, InvoiceWorld};

#[given("a fresh install")]
async fn fresh_install(world: &mut InvoiceWorld) {
    world.system = Some(InvoiceSystem::new().await);
}

#[given(expr = "{word} trades at {float} USD")]
async fn set_price(world: &mut InvoiceWorld, token: String, price: f64) {
    world.system().prices.set_price(&token, price);
}
