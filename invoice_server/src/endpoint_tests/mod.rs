mod helpers;
mod invoices;
mod wallet_events;
