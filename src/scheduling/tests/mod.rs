mod common;
mod ledger;
mod slots;
