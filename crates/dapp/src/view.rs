//! Terminal rendering of [`AppState`].

use std::fmt;

use alloy_primitives::{Address, TxHash};
use comfy_table::{Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS};
use itertools::Itertools;
use petshop_common::PetId;

use crate::state::{AppState, Phase};

pub const WALLET_MISSING: &str = "Wallet not detected. Please configure a wallet provider: set \
     `wallet_url` in petshop.toml or the PETSHOP_WALLET_URL environment variable.";

/// One pet as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PetCard {
    pub id: PetId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Recorded as adopted on-chain.
    pub adopted: bool,
    /// The adopt action is unavailable. Always set for adopted pets and while a transaction is
    /// pending.
    pub disabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Banner {
    /// A connection or loading problem.
    Notice(String),
    /// An adoption is in flight.
    Pending { pet: PetId, tx_hash: Option<TxHash> },
    /// The last adoption failed. Dismissible.
    TxError(String),
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice(notice) => f.write_str(notice),
            Self::Pending { tx_hash: Some(hash), .. } => write!(f, "Waiting for transaction {hash}"),
            Self::Pending { pet, tx_hash: None } => {
                write!(f, "Waiting for the wallet to send the adoption of pet {pet}")
            }
            Self::TxError(reason) => write!(f, "Error sending transaction: {reason}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Static instructions, no wallet exists.
    WalletMissing,
    /// Waiting for the user to connect.
    Connect { connecting: bool, banners: Vec<Banner> },
    /// Connected, data is still loading.
    Loading { address: Address, banners: Vec<Banner> },
    /// The catalog with adoption state.
    Pets { address: Address, cards: Vec<PetCard>, banners: Vec<Banner> },
}

impl View {
    /// Builds the view model of `state`.
    pub fn new(state: &AppState) -> Self {
        let mut banners: Vec<_> =
            state.notice().map(|notice| Banner::Notice(notice.to_string())).into_iter().collect();
        let session = match state.phase() {
            Phase::Uninitialized | Phase::Disconnected => {
                return Self::Connect { connecting: state.is_connecting(), banners };
            }
            Phase::WalletMissing => return Self::WalletMissing,
            Phase::Connected(session) => session,
        };

        if let Some(pending) = session.pending {
            banners.push(Banner::Pending { pet: pending.pet, tx_hash: pending.tx_hash });
        }
        if let Some(err) = &session.tx_error {
            banners.push(Banner::TxError(err.clone()));
        }

        let (Some(catalog), Some(adopted)) = (state.catalog(), session.adopted.as_ref()) else {
            return Self::Loading { address: session.address, banners };
        };
        let locked = session.pending.is_some() || session.gateway.is_none();
        let cards = catalog
            .iter()
            .map(|pet| {
                let adopted = adopted.contains(&pet.id);
                PetCard {
                    id: pet.id,
                    name: pet.name.clone(),
                    description: pet.description.clone(),
                    image: pet.image.clone(),
                    adopted,
                    disabled: adopted || locked,
                }
            })
            .collect();
        Self::Pets { address: session.address, cards, banners }
    }

    /// The pet cards, empty unless the catalog is shown.
    pub fn cards(&self) -> &[PetCard] {
        match self {
            Self::Pets { cards, .. } => cards,
            _ => &[],
        }
    }

    /// The banners to show above the content.
    pub fn banners(&self) -> &[Banner] {
        match self {
            Self::WalletMissing => &[],
            Self::Connect { banners, .. }
            | Self::Loading { banners, .. }
            | Self::Pets { banners, .. } => banners,
        }
    }

    fn table(cards: &[PetCard]) -> Table {
        let mut table = Table::new();
        table.apply_modifier(UTF8_ROUND_CORNERS);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(["ID", "Name", "Description", "Status"]);
        for card in cards {
            let (status, color) = if card.adopted {
                ("Adopted", Color::Green)
            } else if card.disabled {
                ("Unavailable", Color::DarkGrey)
            } else {
                ("Available", Color::Reset)
            };
            table.add_row([
                Cell::new(card.id),
                Cell::new(&card.name),
                Cell::new(card.description.as_deref().unwrap_or_default()),
                Cell::new(status).fg(color),
            ]);
        }
        table
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Self::WalletMissing = self {
            return f.write_str(WALLET_MISSING);
        }
        for banner in self.banners() {
            writeln!(f, "{banner}")?;
        }
        match self {
            Self::WalletMissing => Ok(()),
            Self::Connect { connecting: true, .. } => f.write_str("Connecting to your wallet..."),
            Self::Connect { connecting: false, .. } => f.write_str("Please connect to your wallet."),
            Self::Loading { address, .. } => write!(f, "Connected as {address}\nLoading..."),
            Self::Pets { address, cards, .. } => {
                writeln!(f, "Connected as {address}")?;
                if cards.is_empty() {
                    return f.write_str("No pets to adopt.");
                }
                let adopted = cards.iter().filter(|card| card.adopted).map(|card| card.id);
                let adopted = adopted.format(", ").to_string();
                write!(f, "{}", Self::table(cards))?;
                if !adopted.is_empty() {
                    write!(f, "\nAdopted: {adopted}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{GatewayHandle, TxFailure},
        state::Action,
    };
    use petshop_common::{Catalog, Deployment, PetRecord};
    use petshop_test_utils::{
        MockWallet,
        accounts::{ALICE, CONTRACT},
        pet_adoption_artifact,
    };
    use std::{collections::BTreeSet, sync::Arc, time::Duration};

    fn browsing(ids: &[PetId], adopted: &[PetId]) -> AppState {
        let pets = ids.iter().map(|id| PetRecord::new(*id, format!("pet {id}"))).collect();
        let deployment = Deployment { address: CONTRACT, abi: pet_adoption_artifact().abi };
        let gateway = GatewayHandle::new(
            Arc::new(MockWallet::new()),
            &deployment,
            ALICE,
            Duration::from_millis(1),
        )
        .unwrap();
        [
            Action::Probed { wallet: true },
            Action::CatalogLoaded(Ok(Arc::new(Catalog::new(pets).unwrap()))),
            Action::ConnectRequested,
            Action::Connected(Ok(ALICE)),
            Action::GatewayReady { generation: 1, result: Ok(Arc::new(gateway)) },
            Action::AdoptedLoaded { generation: 1, result: Ok(adopted.iter().copied().collect()) },
        ]
        .into_iter()
        .fold(AppState::default(), |state, action| state.reduce(action).0)
    }

    fn flags(view: &View) -> Vec<(PetId, bool, bool)> {
        view.cards().iter().map(|card| (card.id, card.adopted, card.disabled)).collect()
    }

    #[test]
    fn adopted_pets_are_disabled() {
        let state = browsing(&[1, 2], &[]);
        assert_eq!(flags(&View::new(&state)), [(1, false, false), (2, false, false)]);

        let (state, _) = state.reduce(Action::AdoptRequested(1));
        // Everything is disabled while the adoption is pending.
        assert_eq!(flags(&View::new(&state)), [(1, false, true), (2, false, true)]);

        let receipt =
            crate::gateway::TxReceipt { tx_hash: TxHash::with_last_byte(7), block_number: None };
        let (state, _) = state.reduce(Action::AdoptionResolved {
            generation: 1,
            pet: 1,
            result: Ok(receipt),
        });
        let view = View::new(&state);
        assert_eq!(flags(&view), [(1, true, true), (2, false, false)]);
        assert!(view.banners().is_empty());
    }

    #[test]
    fn disabled_includes_adopted() {
        let state = browsing(&[0, 1, 2, 3], &[0, 3]);
        let view = View::new(&state);
        let adopted: BTreeSet<_> =
            view.cards().iter().filter(|card| card.adopted).map(|card| card.id).collect();
        let disabled: BTreeSet<_> =
            view.cards().iter().filter(|card| card.disabled).map(|card| card.id).collect();
        assert!(disabled.is_superset(&adopted));
        assert_eq!(adopted, BTreeSet::from([0, 3]));
    }

    #[test]
    fn banners() {
        let state = browsing(&[1, 2], &[]);
        let (state, _) = state.reduce(Action::AdoptRequested(2));
        let view = View::new(&state);
        assert_eq!(view.banners(), [Banner::Pending { pet: 2, tx_hash: None }]);

        let tx_hash = TxHash::with_last_byte(1);
        let (state, _) = state.reduce(Action::AdoptionSent { generation: 1, pet: 2, tx_hash });
        let view = View::new(&state);
        assert_eq!(view.banners()[0].to_string(), format!("Waiting for transaction {tx_hash}"));

        let (state, _) = state.reduce(Action::AdoptionResolved {
            generation: 1,
            pet: 2,
            result: Err(TxFailure::Rejected { reason: "User denied transaction".to_string() }),
        });
        let rendered = View::new(&state).to_string();
        assert!(rendered.starts_with("Error sending transaction: User denied transaction\n"));

        let (state, _) = state.reduce(Action::DismissError);
        assert!(View::new(&state).banners().is_empty());
    }

    #[test]
    fn wallet_missing_is_static() {
        let (state, _) = AppState::default().reduce(Action::Probed { wallet: false });
        let view = View::new(&state);
        assert_eq!(view, View::WalletMissing);
        similar_asserts::assert_eq!(view.to_string(), WALLET_MISSING);
    }

    #[test]
    fn connect_prompt() {
        let (state, _) = AppState::default().reduce(Action::Probed { wallet: true });
        similar_asserts::assert_eq!(View::new(&state).to_string(), "Please connect to your wallet.");
    }

    #[test]
    fn renders_table() {
        let state = browsing(&[1, 2], &[2]);
        let rendered = View::new(&state).to_string();
        assert!(rendered.starts_with(&format!("Connected as {ALICE}\n")));
        assert!(rendered.contains("pet 1"));
        assert!(rendered.contains("Available"));
        assert!(rendered.contains("Adopted"));
        assert!(rendered.ends_with("Adopted: 2"));
    }
}
