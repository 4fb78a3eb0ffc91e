//! # Store Contract Properties
//!
//! Every property here runs against all three backends through the same
//! `Arc<dyn ClinicStore>` handle: the in-memory store, SQLite (private
//! in-memory database), and the document store over the in-process
//! key-value engine. A failure names the backend it occurred on.

#[cfg(test)]
mod tests {
    use clinic_core::{
        AppointmentFilter, AppointmentStatus, ClinicStore, DocumentStore, EntityId,
        InMemoryKVStore, MemoryStore, NewAppointment, NewUser, Role, SqliteStore, StoreError,
    };
    use std::sync::Arc;

    fn backends() -> Vec<(&'static str, Arc<dyn ClinicStore>)> {
        vec![
            ("memory", Arc::new(MemoryStore::new())),
            ("sqlite", Arc::new(SqliteStore::open_in_memory().unwrap())),
            (
                "document",
                Arc::new(DocumentStore::new(InMemoryKVStore::new())),
            ),
        ]
    }

    fn new_user(name: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
            phone: Some("555-0100".into()),
            specialization: (role == Role::Doctor).then(|| "General Medicine".into()),
            experience: (role == Role::Doctor).then_some(5),
        }
    }

    async fn seed(store: &Arc<dyn ClinicStore>) -> (EntityId, EntityId, EntityId) {
        let patient = store
            .create_user(new_user("Priya", "priya@example.com", Role::Patient))
            .await
            .unwrap();
        let doctor = store
            .create_user(new_user("Dr. Okafor", "okafor@example.com", Role::Doctor))
            .await
            .unwrap();
        let view = store
            .create_appointment(NewAppointment {
                patient_id: patient.id,
                doctor_id: doctor.id,
                date: "2024-06-01".parse().unwrap(),
                time: "10:00".into(),
                symptoms: "fever".into(),
            })
            .await
            .unwrap();
        (patient.id, doctor.id, view.appointment.id)
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_on_every_backend() {
        for (name, store) in backends() {
            seed(&store).await;
            let err = store
                .create_user(new_user("Other", "priya@example.com", Role::Patient))
                .await
                .unwrap_err();
            assert!(
                matches!(err, StoreError::Conflict(_)),
                "backend {name}: expected Conflict, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_message_ordering_on_every_backend() {
        for (name, store) in backends() {
            let (patient, doctor, room) = seed(&store).await;

            for i in 0..20 {
                let sender = if i % 2 == 0 { patient } else { doctor };
                store
                    .append_message(room, sender, &format!("msg {i}"))
                    .await
                    .unwrap();
            }

            let messages = store.list_messages(room).await.unwrap();
            assert_eq!(messages.len(), 20, "backend {name}");
            for (i, view) in messages.iter().enumerate() {
                assert_eq!(view.message.message, format!("msg {i}"), "backend {name}");
            }
            for pair in messages.windows(2) {
                assert!(
                    pair[0].message.timestamp < pair[1].message.timestamp,
                    "backend {name}: timestamps must be strictly increasing"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_order_on_every_backend() {
        for (name, store) in backends() {
            let (patient, doctor, room) = seed(&store).await;

            let mut handles = Vec::new();
            for i in 0..16 {
                let store = store.clone();
                let sender = if i % 2 == 0 { patient } else { doctor };
                handles.push(tokio::spawn(async move {
                    store
                        .append_message(room, sender, &format!("concurrent {i}"))
                        .await
                        .unwrap()
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            let messages = store.list_messages(room).await.unwrap();
            assert_eq!(messages.len(), 16, "backend {name}: every append persisted");
            for pair in messages.windows(2) {
                assert!(
                    pair[0].message.timestamp < pair[1].message.timestamp,
                    "backend {name}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_partial_update_preserves_clinical_fields_on_every_backend() {
        for (name, store) in backends() {
            let (_, _, id) = seed(&store).await;

            store
                .update_appointment_status(
                    id,
                    AppointmentStatus::Confirmed,
                    Some("flu".into()),
                    None,
                )
                .await
                .unwrap();
            let updated = store
                .update_appointment_status(id, AppointmentStatus::Completed, None, None)
                .await
                .unwrap();

            assert_eq!(
                updated.appointment.diagnosis.as_deref(),
                Some("flu"),
                "backend {name}"
            );
            assert_eq!(updated.appointment.prescription, None, "backend {name}");
            assert_eq!(
                updated.appointment.status,
                AppointmentStatus::Completed,
                "backend {name}"
            );
        }
    }

    #[tokio::test]
    async fn test_denormalized_views_match_user_records_on_every_backend() {
        for (name, store) in backends() {
            let (patient, doctor, _) = seed(&store).await;

            let listed = store
                .list_appointments(AppointmentFilter::by_patient(patient))
                .await
                .unwrap();
            assert_eq!(listed.len(), 1, "backend {name}");

            let view = &listed[0];
            let patient_record = store.user(patient).await.unwrap();
            let doctor_record = store.user(doctor).await.unwrap();
            let embedded_patient = view.patient.as_ref().unwrap();
            let embedded_doctor = view.doctor.as_ref().unwrap();
            assert_eq!(embedded_patient.name, patient_record.name, "backend {name}");
            assert_eq!(embedded_patient.email, patient_record.email, "backend {name}");
            assert_eq!(embedded_doctor.name, doctor_record.name, "backend {name}");
            assert_eq!(
                embedded_doctor.specialization, doctor_record.specialization,
                "backend {name}"
            );
        }
    }

    #[tokio::test]
    async fn test_deleted_user_dangles_on_every_backend() {
        for (name, store) in backends() {
            let (patient, _, _) = seed(&store).await;

            store.delete_user(patient).await.unwrap();

            let listed = store
                .list_appointments(AppointmentFilter::default())
                .await
                .unwrap();
            assert_eq!(listed.len(), 1, "backend {name}: appointment survives");
            assert!(listed[0].patient.is_none(), "backend {name}");
            assert!(listed[0].doctor.is_some(), "backend {name}");
        }
    }

    #[tokio::test]
    async fn test_appointment_requires_existing_users_on_every_backend() {
        for (name, store) in backends() {
            let patient = store
                .create_user(new_user("Solo", "solo@example.com", Role::Patient))
                .await
                .unwrap();
            let err = store
                .create_appointment(NewAppointment {
                    patient_id: patient.id,
                    doctor_id: EntityId::generate(),
                    date: "2024-06-01".parse().unwrap(),
                    time: "10:00".into(),
                    symptoms: "fever".into(),
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, StoreError::NotFound { entity: "doctor", .. }),
                "backend {name}: got {err:?}"
            );
        }
    }
}
