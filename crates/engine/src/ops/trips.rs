use std::collections::{BTreeMap, BTreeSet};

use crate::{
    EngineError, Member, ResultEngine, SessionContext, Trip, TripId,
    util::{normalize_email, normalize_required_text, require_email},
};

use super::{Engine, require_member};

/// Outcome of [`Engine::create_trip`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripCreated {
    pub trip_id: TripId,
    /// Invitee emails with no registered member; they were left out.
    pub unresolved: Vec<String>,
}

impl Engine {
    /// Creates an active trip owned by the signed-in member.
    ///
    /// Invitees are resolved by email through the member directory. The
    /// creator is always a member. Emails nobody registered are reported back
    /// in [`TripCreated::unresolved`].
    pub async fn create_trip(
        &self,
        ctx: &SessionContext,
        name: &str,
        invitees: &[String],
    ) -> ResultEngine<TripCreated> {
        let session = self.signed_in(ctx)?;
        let name = normalize_required_text(name, "trip name")?;
        if invitees.is_empty() {
            return Err(EngineError::Validation(
                "add at least one person to the trip".to_string(),
            ));
        }

        let mut emails = BTreeSet::new();
        let mut ordered = Vec::with_capacity(invitees.len());
        for raw in invitees {
            let email = require_email(raw)?;
            if !emails.insert(email.clone()) {
                return Err(EngineError::Validation(format!(
                    "{email} was already added"
                )));
            }
            ordered.push(email);
        }

        let creator = session.member_id().clone();
        let mut members = BTreeMap::new();
        let mut unresolved = Vec::new();
        for email in ordered {
            match self.directory.member_by_email(&email).await? {
                Some(member_id) => {
                    members.insert(member_id, Member { email });
                }
                None => {
                    tracing::warn!("no member registered with email {email}");
                    unresolved.push(email);
                }
            }
        }
        members.insert(
            creator.clone(),
            Member {
                email: normalize_email(session.email()),
            },
        );

        let trip = Trip::new(TripId::new_v4(), name, creator, members);
        self.store.put_trip(&trip).await?;

        tracing::info!(
            "trip {} created by {} with {} members",
            trip.id,
            trip.creator_id,
            trip.members.len()
        );
        Ok(TripCreated {
            trip_id: trip.id,
            unresolved,
        })
    }

    /// Trips of the signed-in member.
    pub async fn trips(&self, ctx: &SessionContext) -> ResultEngine<Vec<Trip>> {
        let session = self.signed_in(ctx)?;
        let ids = self.store.trips_for_member(session.member_id()).await?;

        let mut trips = Vec::with_capacity(ids.len());
        for trip_id in ids {
            match self.store.fetch_trip(trip_id).await? {
                Some(trip) => trips.push(trip),
                None => tracing::warn!(
                    "trip {trip_id} listed for {} does not exist",
                    session.member_id()
                ),
            }
        }
        Ok(trips)
    }

    /// A single trip; the signed-in member must belong to it.
    pub async fn trip(&self, ctx: &SessionContext, trip_id: TripId) -> ResultEngine<Trip> {
        let session = self.signed_in(ctx)?;
        let trip = self.load_trip(trip_id).await?;
        require_member(&trip, session.member_id())?;
        Ok(trip)
    }
}
