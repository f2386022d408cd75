//! Composition glue between the messaging and ledger layers.

use std::sync::Arc;

use mintbank_accounts::{
    AccountCreatedNotifier, LedgerEngine, LedgerError, LedgerStore, NewAccount,
};
use mintbank_messaging::ProvisioningRequest;

/// Provisioning handler for the event consumer: maps a decoded event onto
/// the engine's account-creation operation. The engine synthesizes the
/// account number.
pub fn event_provisioning_handler<S, N>(
    engine: Arc<LedgerEngine<S, N>>,
) -> impl Fn(ProvisioningRequest) -> Result<(), LedgerError> + Send + Sync + 'static
where
    S: LedgerStore + 'static,
    N: AccountCreatedNotifier + 'static,
{
    move |request: ProvisioningRequest| {
        let mut new_account = NewAccount::new(request.user_id);
        if let Some(name) = request.user_name {
            new_account = new_account.with_user_name(name);
        }
        if let Some(salary) = request.salary {
            new_account = new_account.with_salary(salary);
        }
        engine.create_account(new_account).map(|_| ())
    }
}
