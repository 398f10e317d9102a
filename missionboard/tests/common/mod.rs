//! Shared fixture: one organization with an owner, backed by the in-memory
//! store and a clock fixed at 2025-01-01.

#![allow(dead_code)] // Each test binary uses a different subset

use chrono::{DateTime, Duration, Utc};
use missionboard::aggregates::EventDetails;
use missionboard::app::MemberInput;
use missionboard::mocks::InMemoryStore;
use missionboard::server::AppState;
use missionboard::store::MemberRepository;
use missionboard::types::{
    Capacity, Event, Location, Member, MemberId, MemberRole, MemberStatus, Organization,
    OrganizationId, Session,
};
use missionboard_core::environment::Clock;
use missionboard_testing::{test_clock, FixedClock};
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub store: InMemoryStore,
    pub state: AppState,
    pub organization: Organization,
    pub owner: Member,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::at(test_clock()).await
    }

    pub async fn at(clock: FixedClock) -> Self {
        let store = InMemoryStore::new();
        let now = clock.now();
        let organization = organization("Harbour Rowing Club", now);
        store.insert_organization(organization.clone()).unwrap();

        let owner = store
            .insert_member(member(
                organization.id,
                "Olive Owner",
                "owner@harbour.example",
                MemberRole::Owner,
                now,
            ))
            .await
            .unwrap();

        let state = AppState::new(Arc::new(store.clone()), Arc::new(clock));
        Self {
            store,
            state,
            organization,
            owner,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.state.clock.now()
    }

    /// Add a regular ACTIVE member through the member service.
    pub async fn member(&self, name: &str, email: &str) -> Member {
        self.state
            .members()
            .create(
                self.organization.id,
                MemberInput {
                    name: name.to_string(),
                    email: email.to_string(),
                    phone: None,
                    status: MemberStatus::Active,
                    role: MemberRole::Member,
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    /// Add a second organization with its own owner.
    pub async fn other_organization(&self) -> (Organization, Member) {
        let organization = organization("Riverside Chess Society", self.now());
        self.store.insert_organization(organization.clone()).unwrap();
        let owner = self
            .store
            .insert_member(member(
                organization.id,
                "Rupert Rook",
                "rupert@riverside.example",
                MemberRole::Owner,
                self.now(),
            ))
            .await
            .unwrap();
        (organization, owner)
    }

    /// Issue a session valid for a day and return its bearer token.
    pub fn session_for(&self, member: &Member) -> Uuid {
        let token = Uuid::new_v4();
        self.store
            .insert_session(Session {
                token,
                member_id: member.id,
                expires_at: self.now() + Duration::days(1),
            })
            .unwrap();
        token
    }

    /// Create a public event a month from now.
    pub async fn event(&self, capacity: Option<u32>) -> Event {
        self.event_for(self.organization.id, details("Spring Regatta", self.now(), capacity))
            .await
    }

    pub async fn event_for(&self, organization_id: OrganizationId, details: EventDetails) -> Event {
        self.state
            .events()
            .create(organization_id, Some(self.owner.id), details)
            .await
            .unwrap()
    }
}

pub fn organization(name: &str, now: DateTime<Utc>) -> Organization {
    Organization {
        id: OrganizationId::new(),
        name: name.to_string(),
        contact_email: None,
        timezone: "Europe/London".to_string(),
        default_currency: "GBP".to_string(),
        created_at: now,
    }
}

pub fn member(
    organization_id: OrganizationId,
    name: &str,
    email: &str,
    role: MemberRole,
    now: DateTime<Utc>,
) -> Member {
    Member {
        id: MemberId::new(),
        organization_id,
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        status: MemberStatus::Active,
        role,
        joined_at: now,
        notes: None,
    }
}

pub fn details(name: &str, now: DateTime<Utc>, capacity: Option<u32>) -> EventDetails {
    EventDetails {
        name: name.to_string(),
        description: None,
        date: now + Duration::days(30),
        end_date: None,
        location: Location {
            venue: Some("Boathouse".to_string()),
            address: None,
            city: Some("Bristol".to_string()),
        },
        capacity: capacity.map(Capacity::new),
        is_private: false,
        registration_deadline: None,
    }
}
