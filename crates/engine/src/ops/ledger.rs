use std::collections::BTreeMap;

use crate::{GlobalLedger, MemberId, MoneyCents, ResultEngine, SessionContext};

use super::Engine;

/// One counterpart of the signed-in member's ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerLine {
    pub member_id: MemberId,
    /// `None` when the counterpart is no longer registered.
    pub email: Option<String>,
    pub amount: MoneyCents,
}

/// Global ledger of the signed-in member, ready for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerView {
    pub ledger: GlobalLedger,
    pub owed_to_me: Vec<LedgerLine>,
    pub i_owe: Vec<LedgerLine>,
}

impl Engine {
    /// Reads the signed-in member's global ledger and resolves counterpart
    /// emails.
    pub async fn balances(&self, ctx: &SessionContext) -> ResultEngine<LedgerView> {
        let session = self.signed_in(ctx)?;
        let ledger = self.store.fetch_ledger(session.member_id()).await?;

        let mut emails: BTreeMap<&MemberId, Option<String>> = BTreeMap::new();
        for member_id in ledger.owed_to_me.keys().chain(ledger.i_owe.keys()) {
            if !emails.contains_key(member_id) {
                let email = self.directory.member_email(member_id).await?;
                emails.insert(member_id, email);
            }
        }

        let lines = |entries: &BTreeMap<MemberId, MoneyCents>| -> Vec<LedgerLine> {
            entries
                .iter()
                .map(|(member_id, amount)| LedgerLine {
                    member_id: member_id.clone(),
                    email: emails.get(member_id).cloned().flatten(),
                    amount: *amount,
                })
                .collect()
        };

        let owed_to_me = lines(&ledger.owed_to_me);
        let i_owe = lines(&ledger.i_owe);
        Ok(LedgerView {
            owed_to_me,
            i_owe,
            ledger,
        })
    }
}
