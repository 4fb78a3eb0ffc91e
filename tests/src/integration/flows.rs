//! # End-to-End Lifecycle Flows
//!
//! The canonical patient/doctor scenario exercised through the service and
//! the room broker together, the way the gateway drives them.

#[cfg(test)]
mod tests {
    use clinic_core::{
        AppointmentService, AppointmentStatus, BookingRequest, ClinicStore, CoreError,
        DocumentStore, EntityId, InMemoryKVStore, MemoryStore, NewUser, Principal, Role,
        RoomBroker, SqliteStore, TransitionRequest,
    };
    use std::sync::Arc;

    struct Clinic {
        service: AppointmentService,
        broker: RoomBroker,
        store: Arc<dyn ClinicStore>,
    }

    impl Clinic {
        fn new(store: Arc<dyn ClinicStore>) -> Self {
            Self {
                service: AppointmentService::new(store.clone()),
                broker: RoomBroker::new(store.clone()),
                store,
            }
        }

        async fn register(&self, name: &str, email: &str, role: Role) -> Principal {
            let user = self
                .store
                .create_user(NewUser {
                    name: name.into(),
                    email: email.into(),
                    password_hash: "hash".into(),
                    role,
                    phone: None,
                    specialization: None,
                    experience: None,
                })
                .await
                .unwrap();
            Principal {
                id: user.id,
                role,
            }
        }
    }

    fn clinics() -> Vec<(&'static str, Clinic)> {
        vec![
            ("memory", Clinic::new(Arc::new(MemoryStore::new()))),
            (
                "sqlite",
                Clinic::new(Arc::new(SqliteStore::open_in_memory().unwrap())),
            ),
            (
                "document",
                Clinic::new(Arc::new(DocumentStore::new(InMemoryKVStore::new()))),
            ),
        ]
    }

    /// P books D (2024-06-01 / 10:00 / "fever") -> pending; D confirms ->
    /// confirmed with clinical fields unset; D completes with flu/rest ->
    /// completed with both set; P posts "thanks" -> recorded with sender P,
    /// first in the room history.
    #[tokio::test]
    async fn test_full_consultation_scenario() {
        for (name, clinic) in clinics() {
            let patient = clinic.register("P", "p@example.com", Role::Patient).await;
            let doctor = clinic.register("D", "d@example.com", Role::Doctor).await;

            let booked = clinic
                .service
                .book(
                    &patient,
                    BookingRequest {
                        doctor_id: doctor.id,
                        date: "2024-06-01".parse().unwrap(),
                        time: "10:00".into(),
                        symptoms: "fever".into(),
                    },
                )
                .await
                .unwrap();
            assert_eq!(booked.appointment.status, AppointmentStatus::Pending, "backend {name}");
            let id = booked.appointment.id;

            let confirmed = clinic
                .service
                .transition(
                    &doctor,
                    id,
                    TransitionRequest {
                        status: AppointmentStatus::Confirmed,
                        diagnosis: None,
                        prescription: None,
                    },
                )
                .await
                .unwrap();
            assert_eq!(confirmed.appointment.status, AppointmentStatus::Confirmed);
            assert_eq!(confirmed.appointment.diagnosis, None, "backend {name}");
            assert_eq!(confirmed.appointment.prescription, None, "backend {name}");

            let completed = clinic
                .service
                .transition(
                    &doctor,
                    id,
                    TransitionRequest {
                        status: AppointmentStatus::Completed,
                        diagnosis: Some("flu".into()),
                        prescription: Some("rest".into()),
                    },
                )
                .await
                .unwrap();
            assert_eq!(completed.appointment.status, AppointmentStatus::Completed);
            assert_eq!(completed.appointment.diagnosis.as_deref(), Some("flu"));
            assert_eq!(completed.appointment.prescription.as_deref(), Some("rest"));

            let posted = clinic.broker.post(&patient, id, "thanks").await.unwrap();
            assert_eq!(posted.message.sender_id, patient.id, "backend {name}");

            let history = clinic.broker.history(&patient, id).await.unwrap();
            assert_eq!(history.len(), 1, "backend {name}");
            assert_eq!(history[0].message.message, "thanks");
            assert_eq!(history[0].sender.as_ref().unwrap().name, "P");
        }
    }

    #[tokio::test]
    async fn test_unrelated_patient_cannot_read_the_room() {
        for (name, clinic) in clinics() {
            let patient = clinic.register("P", "p@example.com", Role::Patient).await;
            let doctor = clinic.register("D", "d@example.com", Role::Doctor).await;
            let outsider = clinic.register("Q", "q@example.com", Role::Patient).await;

            let id = clinic
                .service
                .book(
                    &patient,
                    BookingRequest {
                        doctor_id: doctor.id,
                        date: "2024-06-01".parse().unwrap(),
                        time: "10:00".into(),
                        symptoms: "fever".into(),
                    },
                )
                .await
                .unwrap()
                .appointment
                .id;
            clinic.broker.post(&patient, id, "private").await.unwrap();

            let err = clinic.broker.history(&outsider, id).await.unwrap_err();
            assert!(matches!(err, CoreError::Forbidden(_)), "backend {name}");
            let err = clinic.broker.join(&outsider, id).await.unwrap_err();
            assert!(matches!(err, CoreError::Forbidden(_)), "backend {name}");
        }
    }

    /// Chat stays open whatever the appointment status is.
    #[tokio::test]
    async fn test_chat_is_not_gated_on_status() {
        let clinic = Clinic::new(Arc::new(MemoryStore::new()));
        let patient = clinic.register("P", "p@example.com", Role::Patient).await;
        let doctor = clinic.register("D", "d@example.com", Role::Doctor).await;

        let id = clinic
            .service
            .book(
                &patient,
                BookingRequest {
                    doctor_id: doctor.id,
                    date: "2024-06-01".parse().unwrap(),
                    time: "10:00".into(),
                    symptoms: "fever".into(),
                },
            )
            .await
            .unwrap()
            .appointment
            .id;

        clinic
            .service
            .transition(
                &doctor,
                id,
                TransitionRequest {
                    status: AppointmentStatus::Cancelled,
                    diagnosis: None,
                    prescription: None,
                },
            )
            .await
            .unwrap();

        // Cancelled, yet both participants can still talk.
        clinic.broker.post(&patient, id, "still here?").await.unwrap();
        clinic.broker.post(&doctor, id, "yes").await.unwrap();
        assert_eq!(clinic.broker.history(&patient, id).await.unwrap().len(), 2);
    }

    /// A live subscriber sees a message another participant posts; the
    /// membership check runs on the post itself.
    #[tokio::test]
    async fn test_live_fanout_across_participants() {
        let clinic = Clinic::new(Arc::new(MemoryStore::new()));
        let patient = clinic.register("P", "p@example.com", Role::Patient).await;
        let doctor = clinic.register("D", "d@example.com", Role::Doctor).await;

        let id = clinic
            .service
            .book(
                &patient,
                BookingRequest {
                    doctor_id: doctor.id,
                    date: "2024-06-01".parse().unwrap(),
                    time: "10:00".into(),
                    symptoms: "fever".into(),
                },
            )
            .await
            .unwrap()
            .appointment
            .id;

        let mut subscription = clinic.broker.join(&doctor, id).await.unwrap();
        clinic.broker.post(&patient, id, "are you there?").await.unwrap();

        let received = subscription.receiver.recv().await.unwrap();
        assert_eq!(received.message.message, "are you there?");
        assert_eq!(received.sender.as_ref().unwrap().name, "P");
    }

    /// No path out of a terminal state, on any backend.
    #[tokio::test]
    async fn test_terminal_states_are_final() {
        for (name, clinic) in clinics() {
            let patient = clinic.register("P", "p@example.com", Role::Patient).await;
            let doctor = clinic.register("D", "d@example.com", Role::Doctor).await;

            let id = clinic
                .service
                .book(
                    &patient,
                    BookingRequest {
                        doctor_id: doctor.id,
                        date: "2024-06-01".parse().unwrap(),
                        time: "10:00".into(),
                        symptoms: "fever".into(),
                    },
                )
                .await
                .unwrap()
                .appointment
                .id;

            clinic
                .service
                .transition(
                    &doctor,
                    id,
                    TransitionRequest {
                        status: AppointmentStatus::Cancelled,
                        diagnosis: None,
                        prescription: None,
                    },
                )
                .await
                .unwrap();

            for next in [
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
            ] {
                let err = clinic
                    .service
                    .transition(
                        &doctor,
                        id,
                        TransitionRequest {
                            status: next,
                            diagnosis: None,
                            prescription: None,
                        },
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(err, CoreError::Validation(_)), "backend {name}");
            }
        }
    }

    #[tokio::test]
    async fn test_booking_targets_must_be_doctors() {
        let clinic = Clinic::new(Arc::new(MemoryStore::new()));
        let patient = clinic.register("P", "p@example.com", Role::Patient).await;
        let other_patient = clinic.register("Q", "q@example.com", Role::Patient).await;

        let err = clinic
            .service
            .book(
                &patient,
                BookingRequest {
                    doctor_id: other_patient.id,
                    date: "2024-06-01".parse().unwrap(),
                    time: "10:00".into(),
                    symptoms: "fever".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "doctor", .. }));

        let err = clinic
            .service
            .book(
                &patient,
                BookingRequest {
                    doctor_id: EntityId::generate(),
                    date: "2024-06-01".parse().unwrap(),
                    time: "10:00".into(),
                    symptoms: "fever".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "doctor", .. }));
    }
}
