use std::str::FromStr;

use chrono::{Duration, Utc};
use cucumber::{then, when};
use invoice_engine::{
    db_types::{InvoiceStatus, NewInvoice},
    events::WalletBalanceEvent,
    test_utils::collaborators::FakeCustody,
    InvoiceManagement,
    UpdateInvoiceRequest,
};
use ipg_common::UsdCents;

use crate::cucumber::InvoiceWorld;

#[when(expr = "client '{word}' requests an invoice [{word}] for {int} cents")]
async fn create_invoice(world: &mut InvoiceWorld, client: String, alias: String, cents: i64) {
    let invoice =
        world.api().create_invoice(client.into(), UsdCents::from(cents)).await.expect("Error creating invoice");
    world.system_mut().invoices.insert(alias, invoice.id);
}

#[when(expr = "client '{word}' requested an invoice [{word}] for {int} cents {int} minutes ago")]
async fn create_old_invoice(world: &mut InvoiceWorld, client: String, alias: String, cents: i64, minutes: i64) {
    let created_at = Utc::now() - Duration::minutes(minutes);
    let new = NewInvoice::new(client.into(), UsdCents::from(cents)).with_created_at(created_at);
    let invoice = world.api().db().insert_invoice(new).await.expect("Error creating invoice");
    world.system_mut().invoices.insert(alias, invoice.id);
}

#[when(expr = "invoice [{word}] is to be paid in {word} on {word}")]
async fn choose_token(world: &mut InvoiceWorld, alias: String, token: String, chain: String) {
    let request = UpdateInvoiceRequest::new(world.invoice_id(&alias), chain, token);
    world.api().update_invoice(request).await.expect("Error updating invoice");
}

#[when(expr = "invoice [{word}] cannot be paid in {word} on {word}")]
async fn choose_token_fails(world: &mut InvoiceWorld, alias: String, token: String, chain: String) {
    let request = UpdateInvoiceRequest::new(world.invoice_id(&alias), chain, token);
    assert!(world.api().update_invoice(request).await.is_err(), "Invoice update should have failed");
}

#[when(expr = "the deposit address of invoice [{word}] holds {int} units of {word} on {word}")]
async fn observe_balance(world: &mut InvoiceWorld, alias: String, units: u64, token: String, chain: String) {
    let id = world.invoice_id(&alias);
    let event = WalletBalanceEvent { address: FakeCustody::address_for(&id), balance: u128::from(units), chain, token };
    world.system().matcher.handle_event(event).await.expect("Error handling wallet event");
}

#[when(expr = "custody rejects the next {int} transfers")]
async fn reject_transfers(world: &mut InvoiceWorld, count: u32) {
    world.system().custody.fail_next_transfers(count);
}

#[when("custody rejects every transfer")]
async fn reject_all_transfers(world: &mut InvoiceWorld) {
    world.system().custody.fail_all_transfers(true);
}

#[when("the settlement worker runs")]
async fn run_settlement(world: &mut InvoiceWorld) {
    let handles = world.system().settlement.tick().await.expect("Error fetching invoices to settle");
    for handle in handles {
        handle.await.expect("Settlement attempt panicked");
    }
}

#[when("the expiry sweep runs")]
async fn run_expiry(world: &mut InvoiceWorld) {
    world.system().sweeper.run_once().await.expect("Error expiring invoices");
}

#[when(expr = "the operator sets the gas limit of invoice [{word}] to {int}")]
async fn set_gas_limit(world: &mut InvoiceWorld, alias: String, gas_limit: i64) {
    let id = world.invoice_id(&alias);
    world.api().set_gas_limit(&id, gas_limit).await.expect("Error setting gas limit");
}

#[when(expr = "the operator moves invoice [{word}] to {word}")]
async fn move_invoice(world: &mut InvoiceWorld, alias: String, status: String) {
    let id = world.invoice_id(&alias);
    let status = InvoiceStatus::from_str(&status).expect("Not a valid invoice status");
    world.api().update_invoice_status(&id, status).await.expect("Error changing invoice status");
}

#[when(expr = "the operator cannot move invoice [{word}] to {word}")]
async fn move_invoice_fails(world: &mut InvoiceWorld, alias: String, status: String) {
    let id = world.invoice_id(&alias);
    let status = InvoiceStatus::from_str(&status).expect("Not a valid invoice status");
    assert!(world.api().update_invoice_status(&id, status).await.is_err(), "Status change should have failed");
}

#[then(expr = "invoice [{word}] has status {word}")]
async fn check_status(world: &mut InvoiceWorld, alias: String, status: String) {
    let expected = InvoiceStatus::from_str(&status).expect("Not a valid invoice status");
    let invoice = world.api().check_invoice(&world.invoice_id(&alias)).await.expect("Error fetching invoice");
    assert_eq!(invoice.status, expected, "Invoice [{alias}] has the wrong status");
}

#[then(expr = "invoice [{word}] is owed {float} {word}")]
async fn check_token_amount(world: &mut InvoiceWorld, alias: String, amount: f64, token: String) {
    let invoice = world.api().check_invoice(&world.invoice_id(&alias)).await.expect("Error fetching invoice");
    assert_eq!(invoice.token.as_deref(), Some(token.as_str()));
    let owed = invoice.token_amount.expect("Invoice has not been priced");
    assert!((owed - amount).abs() < 1e-9, "Invoice [{alias}] is owed {owed}, not {amount}");
}

#[then(expr = "custody made {int} transfer(s) for invoice [{word}]")]
async fn check_transfer_count(world: &mut InvoiceWorld, count: usize, alias: String) {
    let transfers = world.system().custody.transfers_for(&world.invoice_id(&alias));
    assert_eq!(transfers.len(), count, "Unexpected number of transfers for invoice [{alias}]");
}

#[then(expr = "the transfers for invoice [{word}] used the gas limits {string}")]
async fn check_gas_limits(world: &mut InvoiceWorld, alias: String, limits: String) {
    let expected = limits.split(',').map(|l| l.trim().parse::<i64>().ok()).collect::<Vec<_>>();
    let transfers = world.system().custody.transfers_for(&world.invoice_id(&alias));
    let used = transfers.into_iter().map(|t| t.gas_limit).collect::<Vec<_>>();
    assert_eq!(used, expected);
}

#[then(expr = "the operator was alerted about invoice [{word}]")]
async fn check_alert(world: &mut InvoiceWorld, alias: String) {
    let id = world.invoice_id(&alias);
    let alerts = world.system().alerts.alerts();
    assert!(alerts.iter().any(|a| a.contains(id.as_str())), "No alert for invoice [{alias}]: {alerts:?}");
}

#[then("the operator was not alerted")]
async fn check_no_alert(world: &mut InvoiceWorld) {
    assert!(world.system().alerts.alerts().is_empty());
}
