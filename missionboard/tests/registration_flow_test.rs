//! Registration scenarios through the services and the in-memory store.
//!
//! Run with: `cargo test --test registration_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use common::{details, Fixture};
use missionboard::app::{PublicRegistration, RegistrationRequest};
use missionboard::error::MissionBoardError;
use missionboard::types::{MemberRole, MemberStatus, RegistrationStatus};

fn request(guests_count: u32) -> RegistrationRequest {
    RegistrationRequest {
        guests_count,
        notes: None,
    }
}

fn public_form(name: &str, email: &str) -> PublicRegistration {
    PublicRegistration {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        guests_count: 0,
        notes: None,
    }
}

#[tokio::test]
async fn test_capacity_one_waitlist_and_promotion() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(1)).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let bob = fx.member("Bob", "bob@harbour.example").await;
    let registrations = fx.state.registrations();

    let first = registrations.register(&alice, event.id, request(0)).await.unwrap();
    assert!(first.created);
    assert_eq!(first.registration.status, RegistrationStatus::Confirmed);

    let second = registrations.register(&bob, event.id, request(0)).await.unwrap();
    assert_eq!(second.registration.status, RegistrationStatus::Waitlisted);

    let overview = fx.state.events().get(fx.organization.id, event.id).await.unwrap();
    assert_eq!(overview.attendance.seats_taken, 1);
    assert_eq!(overview.attendance.waitlisted, 1);
    assert_eq!(overview.attendance.capacity_percentage, Some(100));

    let outcome = registrations.cancel(&alice, event.id).await.unwrap();
    assert_eq!(outcome.cancelled.status, RegistrationStatus::CanceledByUser);
    assert_eq!(outcome.promoted.len(), 1);
    let promoted = &outcome.promoted[0];
    assert_eq!(promoted.member_id, bob.id);
    assert_eq!(promoted.status, RegistrationStatus::Confirmed);

    let stored = fx.store.registrations(event.id).unwrap();
    let bob_row = stored.iter().find(|r| r.member_id == bob.id).unwrap();
    assert_eq!(bob_row.status, RegistrationStatus::Confirmed);
}

#[tokio::test]
async fn test_reregistration_reuses_row() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(10)).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let registrations = fx.state.registrations();

    let original = registrations.register(&alice, event.id, request(1)).await.unwrap();
    registrations.cancel(&alice, event.id).await.unwrap();
    let again = registrations.register(&alice, event.id, request(2)).await.unwrap();

    assert!(!again.created);
    assert_eq!(again.registration.id, original.registration.id);
    assert_eq!(again.registration.guests_count, 2);
    assert_eq!(again.registration.status, RegistrationStatus::Confirmed);
    assert_eq!(fx.store.registrations(event.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let fx = Fixture::new().await;
    let event = fx.event(None).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let registrations = fx.state.registrations();

    registrations.register(&alice, event.id, request(0)).await.unwrap();
    let err = registrations
        .register(&alice, event.id, request(0))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_guests_overflowing_capacity_are_waitlisted() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(3)).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let bob = fx.member("Bob", "bob@harbour.example").await;
    let registrations = fx.state.registrations();

    let party = registrations.register(&alice, event.id, request(1)).await.unwrap();
    assert_eq!(party.registration.status, RegistrationStatus::Confirmed);

    // Two seats taken, Bob brings two guests: three seats do not fit in one.
    let overflow = registrations.register(&bob, event.id, request(2)).await.unwrap();
    assert_eq!(overflow.registration.status, RegistrationStatus::Waitlisted);
}

#[tokio::test]
async fn test_event_of_other_organization_is_not_found() {
    let fx = Fixture::new().await;
    let (other_org, _) = fx.other_organization().await;
    let foreign = fx
        .event_for(other_org.id, details("Blitz Night", fx.now(), None))
        .await;
    let alice = fx.member("Alice", "alice@harbour.example").await;

    let err = fx
        .state
        .registrations()
        .register(&alice, foreign.id, request(0))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_cancelled_event_rejects_registration() {
    let fx = Fixture::new().await;
    let event = fx.event(None).await;
    fx.state
        .events()
        .cancel(fx.organization.id, event.id)
        .await
        .unwrap();
    let alice = fx.member("Alice", "alice@harbour.example").await;

    let err = fx
        .state
        .registrations()
        .register(&alice, event.id, request(0))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_admin_cancel_and_check_in() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(1)).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let bob = fx.member("Bob", "bob@harbour.example").await;
    let registrations = fx.state.registrations();

    let alice_reg = registrations.register(&alice, event.id, request(0)).await.unwrap();
    registrations.register(&bob, event.id, request(0)).await.unwrap();

    let outcome = registrations
        .admin_cancel(fx.organization.id, event.id, alice_reg.registration.id)
        .await
        .unwrap();
    assert_eq!(outcome.cancelled.status, RegistrationStatus::CanceledByAdmin);
    let promoted = outcome.promoted.into_iter().next().unwrap();
    assert_eq!(promoted.member_id, bob.id);

    let attended = registrations
        .mark_attended(fx.organization.id, event.id, promoted.id)
        .await
        .unwrap();
    assert_eq!(attended.status, RegistrationStatus::Attended);

    let attendees = registrations
        .attendees(fx.organization.id, event.id)
        .await
        .unwrap();
    assert_eq!(attendees.len(), 2);
    assert!(attendees.iter().any(|a| a.member_email == "bob@harbour.example"));
}

#[tokio::test]
async fn test_registered_member_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(1)).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;
    let bob = fx.member("Bob", "bob@harbour.example").await;
    let registrations = fx.state.registrations();
    registrations.register(&alice, event.id, request(0)).await.unwrap();
    registrations.register(&bob, event.id, request(0)).await.unwrap();

    let err = fx
        .state
        .members()
        .delete(fx.organization.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Conflict(_)), "got {err:?}");

    // Alice still holds the seat and Bob is still next in line.
    let overview = fx.state.events().get(fx.organization.id, event.id).await.unwrap();
    assert_eq!(overview.attendance.seats_taken, 1);
    assert_eq!(overview.attendance.waitlisted, 1);

    // Her seat is released through cancellation, which promotes Bob; the row
    // itself keeps blocking the delete.
    let outcome = registrations.cancel(&alice, event.id).await.unwrap();
    assert_eq!(outcome.promoted[0].member_id, bob.id);
    let err = fx
        .state
        .members()
        .delete(fx.organization.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Conflict(_)), "got {err:?}");

    // A member who never registered can be deleted.
    let carol = fx.member("Carol", "carol@harbour.example").await;
    fx.state
        .members()
        .delete(fx.organization.id, carol.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_public_registration_creates_pending_member() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(5)).await;

    let outcome = fx
        .state
        .registrations()
        .register_public(event.id, public_form("Grace Hopper", "  Grace@Example.COM "))
        .await
        .unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.registration.status, RegistrationStatus::Confirmed);

    let member = fx
        .state
        .members()
        .get(fx.organization.id, outcome.registration.member_id)
        .await
        .unwrap();
    assert_eq!(member.email, "grace@example.com");
    assert_eq!(member.status, MemberStatus::Pending);
    assert_eq!(member.role, MemberRole::Member);
    assert_eq!(member.organization_id, fx.organization.id);
}

#[tokio::test]
async fn test_public_registration_reuses_existing_member() {
    let fx = Fixture::new().await;
    let event = fx.event(None).await;
    let alice = fx.member("Alice", "alice@harbour.example").await;

    let outcome = fx
        .state
        .registrations()
        .register_public(event.id, public_form("Alice A.", "ALICE@harbour.example"))
        .await
        .unwrap();
    assert_eq!(outcome.registration.member_id, alice.id);
}

#[tokio::test]
async fn test_public_registration_hides_private_events() {
    let fx = Fixture::new().await;
    let mut private = details("Committee Dinner", fx.now(), None);
    private.is_private = true;
    let event = fx.event_for(fx.organization.id, private).await;

    let err = fx
        .state
        .registrations()
        .register_public(event.id, public_form("Grace", "grace@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::NotFound { .. }), "got {err:?}");

    let err = fx.state.events().get_public(event.id).await.unwrap_err();
    assert!(matches!(err, MissionBoardError::NotFound { .. }));
}

#[tokio::test]
async fn test_public_registration_rejects_other_organizations_member() {
    let fx = Fixture::new().await;
    let (_, rupert) = fx.other_organization().await;
    let event = fx.event(None).await;

    let err = fx
        .state
        .registrations()
        .register_public(event.id, public_form("Rupert", &rupert.email))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_public_registration_validates_form() {
    let fx = Fixture::new().await;
    let event = fx.event(None).await;

    let err = fx
        .state
        .registrations()
        .register_public(event.id, public_form("Grace", "not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Validation(_)), "got {err:?}");

    let err = fx
        .state
        .registrations()
        .register_public(event.id, public_form("   ", "grace@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, MissionBoardError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_public_listing_shows_only_public_scheduled_events() {
    let fx = Fixture::new().await;
    let open = fx.event(Some(20)).await;
    let mut private = details("Committee Dinner", fx.now(), None);
    private.is_private = true;
    fx.event_for(fx.organization.id, private).await;
    let called_off = fx.event(None).await;
    fx.state
        .events()
        .cancel(fx.organization.id, called_off.id)
        .await
        .unwrap();

    let listed = fx.state.events().list_public().await.unwrap();
    let ids: Vec<_> = listed.iter().map(|o| o.event.id).collect();
    assert_eq!(ids, vec![open.id]);
    assert_eq!(listed[0].attendance.remaining_seats, Some(20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_never_overbook() {
    let fx = Fixture::new().await;
    let event = fx.event(Some(5)).await;

    let mut members = Vec::new();
    for i in 0..20 {
        let email = format!("rower{i}@harbour.example");
        members.push(fx.member(&format!("Rower {i}"), &email).await);
    }

    let handles: Vec<_> = members
        .into_iter()
        .map(|member| {
            let registrations = fx.state.registrations();
            let event_id = event.id;
            tokio::spawn(async move {
                registrations
                    .register(&member, event_id, request(0))
                    .await
                    .map(|outcome| outcome.registration.status)
            })
        })
        .collect();

    let mut confirmed = 0;
    let mut waitlisted = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            RegistrationStatus::Confirmed => confirmed += 1,
            RegistrationStatus::Waitlisted => waitlisted += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(confirmed, 5);
    assert_eq!(waitlisted, 15);
    let overview = fx.state.events().get(fx.organization.id, event.id).await.unwrap();
    assert_eq!(overview.attendance.seats_taken, 5);
    assert_eq!(overview.attendance.remaining_seats, Some(0));
}
