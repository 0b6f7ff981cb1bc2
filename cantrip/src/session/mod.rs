//! Interaction sessions
//!
//! Tracks every in-progress attack wizard and attack resolution:
//! - Each interaction is owned by the user that started it
//! - Finished interactions are dropped immediately
//! - Abandoned interactions are swept once they outlive the configured lifetime

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::attack::{
    AttackDefinition, AttackResolutionFlow, AttackWizard, InteractionError, ResolutionEvent,
    ResolutionStep, WizardEvent, WizardStep,
};
use crate::character::CharacterAbilityBlock;

/// A resolution flow together with its own random stream
#[derive(Debug)]
struct ResolutionSession {
    flow: AttackResolutionFlow,
    rng: StdRng,
}

#[derive(Debug)]
enum Interaction {
    Wizard(AttackWizard),
    Resolution(ResolutionSession),
}

impl Interaction {
    fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Wizard(_) => InteractionKind::Wizard,
            Interaction::Resolution(_) => InteractionKind::Resolution,
        }
    }
}

/// Which flow an interaction id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Wizard,
    Resolution,
}

#[derive(Debug)]
struct Entry {
    owner_id: String,
    started: Instant,
    interaction: Interaction,
}

/// State of a wizard after an event
#[derive(Debug, Clone)]
pub struct WizardProgress {
    pub step: WizardStep,
    /// Present once the wizard completes
    pub definition: Option<AttackDefinition>,
}

/// State of a resolution after an event
#[derive(Debug, Clone)]
pub struct ResolutionProgress {
    pub step: ResolutionStep,
    pub transcript: Vec<String>,
}

/// Interaction manager shared by all request handlers
#[derive(Debug, Default)]
pub struct InteractionManager {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InteractionManager {
    /// Create a new interaction manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of live interactions
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Register a wizard and return its interaction id
    pub async fn start_wizard(&self, owner_id: &str, wizard: AttackWizard) -> Uuid {
        let id = Uuid::new_v4();
        debug!("Starting attack wizard {} for {}", id, owner_id);
        self.insert(id, owner_id, Interaction::Wizard(wizard)).await;
        id
    }

    /// Register a resolution flow, seeding it from the OS
    pub async fn start_resolution(
        &self,
        owner_id: &str,
        attack: AttackDefinition,
        abilities: CharacterAbilityBlock,
    ) -> (Uuid, ResolutionProgress) {
        self.start_resolution_with_rng(owner_id, attack, abilities, StdRng::from_os_rng())
            .await
    }

    /// Register a resolution flow with a caller-supplied random stream
    pub async fn start_resolution_with_rng(
        &self,
        owner_id: &str,
        attack: AttackDefinition,
        abilities: CharacterAbilityBlock,
        rng: StdRng,
    ) -> (Uuid, ResolutionProgress) {
        let id = Uuid::new_v4();
        let flow = AttackResolutionFlow::new(attack, abilities);
        let progress = ResolutionProgress {
            step: flow.step(),
            transcript: flow.transcript().to_vec(),
        };
        debug!("Starting attack resolution {} for {}", id, owner_id);
        self.insert(
            id,
            owner_id,
            Interaction::Resolution(ResolutionSession { flow, rng }),
        )
        .await;
        (id, progress)
    }

    async fn insert(&self, id: Uuid, owner_id: &str, interaction: Interaction) {
        self.entries.write().await.insert(
            id,
            Entry {
                owner_id: owner_id.to_string(),
                started: Instant::now(),
                interaction,
            },
        );
    }

    /// Feed one event to a wizard. A completed wizard stays registered
    /// until [`finish_wizard`](Self::finish_wizard) or
    /// [`reopen_wizard`](Self::reopen_wizard) is called for it.
    pub async fn advance_wizard(
        &self,
        id: Uuid,
        owner_id: &str,
        event: WizardEvent,
    ) -> Result<WizardProgress, InteractionError> {
        let mut entries = self.entries.write().await;
        let wizard = owned_wizard(&mut entries, id, owner_id)?;

        let step = wizard.handle(event)?;
        Ok(WizardProgress {
            step,
            definition: wizard.definition().cloned(),
        })
    }

    /// Drop a completed wizard once its attack has been saved
    pub async fn finish_wizard(&self, id: Uuid, owner_id: &str) -> Result<(), InteractionError> {
        let mut entries = self.entries.write().await;
        let wizard = owned_wizard(&mut entries, id, owner_id)?;
        if !wizard.is_complete() {
            return Err(InteractionError::UnexpectedEvent {
                expected: "wizard events",
                got: "finish",
            });
        }
        entries.remove(&id);
        Ok(())
    }

    /// Send a completed wizard back to its last step so the input can be retried
    pub async fn reopen_wizard(&self, id: Uuid, owner_id: &str) -> Result<WizardStep, InteractionError> {
        let mut entries = self.entries.write().await;
        let wizard = owned_wizard(&mut entries, id, owner_id)?;
        wizard.reopen();
        Ok(wizard.step())
    }

    /// Feed one event to a resolution flow; finished flows are removed
    pub async fn advance_resolution(
        &self,
        id: Uuid,
        owner_id: &str,
        event: ResolutionEvent,
    ) -> Result<ResolutionProgress, InteractionError> {
        let mut entries = self.entries.write().await;
        let entry = owned_entry(&mut entries, id, owner_id)?;

        let Interaction::Resolution(session) = &mut entry.interaction else {
            return Err(InteractionError::NotFound(id));
        };

        let step = session.flow.handle(event, &mut session.rng)?;
        let progress = ResolutionProgress {
            step,
            transcript: session.flow.transcript().to_vec(),
        };

        if step.is_terminal() {
            entries.remove(&id);
        }
        Ok(progress)
    }

    /// Current step of a wizard
    pub async fn wizard_step(&self, id: Uuid, owner_id: &str) -> Result<WizardStep, InteractionError> {
        let mut entries = self.entries.write().await;
        Ok(owned_wizard(&mut entries, id, owner_id)?.step())
    }

    /// Drop an interaction of the given kind before it finishes
    pub async fn cancel(
        &self,
        id: Uuid,
        owner_id: &str,
        kind: InteractionKind,
    ) -> Result<(), InteractionError> {
        let mut entries = self.entries.write().await;
        if owned_entry(&mut entries, id, owner_id)?.interaction.kind() != kind {
            return Err(InteractionError::NotFound(id));
        }
        entries.remove(&id);
        debug!("Cancelled interaction {}", id);
        Ok(())
    }

    /// Discard interactions older than `ttl`; returns how many were dropped
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.started.elapsed() < ttl);
        let expired = before - entries.len();
        if expired > 0 {
            info!("Expired {} abandoned interaction(s)", expired);
        }
        expired
    }
}

fn owned_entry<'a>(
    entries: &'a mut HashMap<Uuid, Entry>,
    id: Uuid,
    owner_id: &str,
) -> Result<&'a mut Entry, InteractionError> {
    let entry = entries.get_mut(&id).ok_or(InteractionError::NotFound(id))?;
    if entry.owner_id != owner_id {
        return Err(InteractionError::NotOwner);
    }
    Ok(entry)
}

fn owned_wizard<'a>(
    entries: &'a mut HashMap<Uuid, Entry>,
    id: Uuid,
    owner_id: &str,
) -> Result<&'a mut AttackWizard, InteractionError> {
    let entry = owned_entry(entries, id, owner_id)?;
    match &mut entry.interaction {
        Interaction::Wizard(wizard) => Ok(wizard),
        Interaction::Resolution(_) => Err(InteractionError::NotFound(id)),
    }
}
