//! Tests for `FlowValue`.

use uuid::Uuid;

use super::FlowValue;

#[test]
fn absent_is_not_present() {
  assert!(!FlowValue::Absent.is_present());
  assert!(FlowValue::AmphoraId(Uuid::new_v4()).is_present());
}

#[test]
fn accessors_reject_other_variants() {
  let id = Uuid::new_v4();
  let v = FlowValue::AmphoraId(id);
  assert_eq!(v.as_amphora_id(), Some(id));
  assert!(v.as_compute_id().is_none());
  assert!(v.as_amphora().is_none());
  assert!(FlowValue::Absent.as_amphora_id().is_none());
}

#[test]
fn kind_names_variants() {
  assert_eq!(FlowValue::Absent.kind(), "absent");
  assert_eq!(FlowValue::ComputeId(Uuid::new_v4()).kind(), "compute_id");
}
