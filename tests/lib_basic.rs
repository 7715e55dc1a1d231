#![forbid(unsafe_code)]
use chrono::{TimeZone, Utc};
use shiftboard::{ShiftError, ShiftOccurrence, ShiftState, VolunteerId, WeekdaySet};

fn shift(capacity: u32) -> ShiftOccurrence {
    let start = Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 10, 2, 12, 0, 0).unwrap();
    ShiftOccurrence::create("Distribution", start, end, capacity, "We".parse().unwrap()).unwrap()
}

fn names(s: &ShiftOccurrence) -> Vec<&str> {
    s.volunteers().iter().map(VolunteerId::as_str).collect()
}

#[test]
fn capacity_two_signup_sequence() {
    let mut s = shift(2);
    let (a, b, c) = (VolunteerId::new("A"), VolunteerId::new("B"), VolunteerId::new("C"));

    s.sign_up(&a).unwrap();
    assert_eq!(s.state(), ShiftState::Scheduled);

    s.sign_up(&b).unwrap();
    assert_eq!(s.state(), ShiftState::Full);

    assert_eq!(s.sign_up(&c), Err(ShiftError::CapacityExceeded { capacity: 2 }));
    assert_eq!(names(&s), vec!["A", "B"]);

    s.withdraw(&a).unwrap();
    assert_eq!(s.state(), ShiftState::Scheduled);
    assert_eq!(names(&s), vec!["B"]);
}

#[test]
fn signups_never_exceed_capacity() {
    // séquence pseudo-aléatoire déterministe (LCG)
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as usize
    };

    for capacity in 0..5u32 {
        let mut s = shift(capacity);
        for _ in 0..500 {
            let who = VolunteerId::new(format!("v{}", next() % 8));
            let before = s.clone();
            let result = if next() % 3 == 0 {
                s.withdraw(&who)
            } else {
                s.sign_up(&who)
            };
            if result.is_err() {
                assert_eq!(s, before, "failed operation must not mutate");
            }
            assert!(s.signed_up() <= s.capacity() as usize);
        }
    }
}

#[test]
fn lowering_capacity_below_signups_fails_without_change() {
    let mut s = shift(4);
    for v in ["a", "b", "c"] {
        s.sign_up(&VolunteerId::new(v)).unwrap();
    }
    for requested in 0..3u32 {
        let before = s.clone();
        assert_eq!(
            s.update_capacity(requested),
            Err(ShiftError::CapacityBelowSignups { requested, signed_up: 3 })
        );
        assert_eq!(s, before);
    }
    s.update_capacity(3).unwrap();
    assert_eq!(s.state(), ShiftState::Full);
}

#[test]
fn deleted_shift_is_terminal() {
    let mut s = shift(1);
    assert!(s.delete(false).unwrap().is_empty());
    assert_eq!(s.state(), ShiftState::Deleted);
    assert_eq!(s.withdraw(&VolunteerId::new("a")), Err(ShiftError::Deleted));
    assert_eq!(s.update_capacity(5), Err(ShiftError::Deleted));
    let t = Utc.with_ymd_and_hms(2024, 10, 3, 9, 0, 0).unwrap();
    assert_eq!(s.reschedule(t, t + chrono::Duration::hours(1)), Err(ShiftError::Deleted));
}

#[test]
fn one_off_shift_has_empty_recurrence() {
    let start = Utc.with_ymd_and_hms(2024, 12, 24, 18, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 12, 24, 23, 0, 0).unwrap();
    let s = ShiftOccurrence::create("Réveillon", start, end, 10, WeekdaySet::new()).unwrap();
    assert!(!s.is_recurring());
    assert_eq!(s.date(), chrono::NaiveDate::from_ymd_opt(2024, 12, 24).unwrap());
}
