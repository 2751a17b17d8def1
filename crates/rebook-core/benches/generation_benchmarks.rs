use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rebook_core::conflict::ConflictDetector;
use rebook_core::holiday::{HolidaySet, NoHolidays};
use rebook_core::models::{BookedInterval, Buffers, PatternDefinition, PatternType};
use rebook_core::recurrence::OccurrenceGenerator;
use uuid::Uuid;

fn create_test_pattern(pattern_type: PatternType) -> PatternDefinition {
    let start_date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    let mut pattern = PatternDefinition {
        id: Uuid::now_v7(),
        resource_id: "bench-room".to_string(),
        pattern_type,
        preferred_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        duration_minutes: 45,
        start_date,
        end_date: None,
        occurrence_count: Some(10_000),
        days_of_week: Vec::new(),
        day_of_month: None,
        week_of_month: None,
        weekday_of_month: None,
        interval_days: None,
        anchor_date: None,
        exclude_holidays: true,
        exclude_weekends: true,
        reschedule_on_conflict: false,
        max_advance_days: 3650,
        buffer_before: 5,
        buffer_after: 10,
        timezone: "Europe/Berlin".to_string(),
        created_at: Utc::now(),
    };
    match pattern_type {
        PatternType::Weekly | PatternType::Biweekly => {
            pattern.days_of_week = vec![Weekday::Mon, Weekday::Wed, Weekday::Fri];
        }
        PatternType::Monthly => pattern.day_of_month = Some(31),
        PatternType::Custom => {
            pattern.interval_days = Some(3);
            pattern.anchor_date = Some(start_date);
        }
    }
    pattern
}

fn random_holidays(count: usize) -> HolidaySet {
    let base = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    HolidaySet::new((0..count).map(|_| base + Duration::days(fastrand::i64(0..3650))))
}

fn random_bookings(count: usize) -> Vec<BookedInterval> {
    let base: DateTime<Utc> = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|_| {
            let start = base + Duration::minutes(fastrand::i64(0..3650 * 24 * 4) * 15);
            BookedInterval {
                appointment_id: Uuid::now_v7(),
                series_id: None,
                resource_id: "bench-room".to_string(),
                start_at: start,
                end_at: start + Duration::minutes(fastrand::i64(2..8) * 15),
                buffer_before: 0,
                buffer_after: 0,
            }
        })
        .collect()
}

fn bench_generation_by_type(c: &mut Criterion) {
    let window_start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let window_end = NaiveDate::from_ymd_opt(2039, 12, 31).unwrap();
    let holidays = random_holidays(100);

    let mut group = c.benchmark_group("generation");
    for pattern_type in [
        PatternType::Weekly,
        PatternType::Biweekly,
        PatternType::Monthly,
        PatternType::Custom,
    ] {
        let pattern = create_test_pattern(pattern_type);
        group.bench_with_input(
            BenchmarkId::new("type", pattern_type),
            &pattern,
            |b, pattern| {
                let generator = OccurrenceGenerator::new(pattern, &holidays);
                b.iter(|| {
                    generator.generate(
                        black_box(window_start),
                        black_box(window_end),
                        black_box(500),
                    )
                })
            },
        );
    }
    group.finish();
}

fn bench_generation_by_count(c: &mut Criterion) {
    let pattern = create_test_pattern(PatternType::Weekly);
    let window_start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let window_end = NaiveDate::from_ymd_opt(2039, 12, 31).unwrap();
    let generator = OccurrenceGenerator::new(&pattern, &NoHolidays);

    let mut group = c.benchmark_group("generation_count");
    for count in [10usize, 50, 200, 500] {
        group.bench_with_input(BenchmarkId::new("max_count", count), &count, |b, &count| {
            b.iter(|| generator.generate(black_box(window_start), black_box(window_end), count))
        });
    }
    group.finish();
}

fn bench_conflict_annotation(c: &mut Criterion) {
    let pattern = create_test_pattern(PatternType::Weekly);
    let tz: chrono_tz::Tz = "Europe/Berlin".parse().unwrap();
    let window_start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let window_end = NaiveDate::from_ymd_opt(2039, 12, 31).unwrap();
    let occurrences: Vec<_> = OccurrenceGenerator::new(&pattern, &NoHolidays)
        .generate(window_start, window_end, 500)
        .iter()
        .map(|slot| slot.to_occurrence(&pattern, &tz))
        .collect();

    let mut group = c.benchmark_group("conflict_annotation");
    for bookings in [100usize, 1_000, 10_000] {
        let detector = ConflictDetector::new("bench-room", random_bookings(bookings));
        group.bench_with_input(
            BenchmarkId::new("bookings", bookings),
            &detector,
            |b, detector| {
                b.iter(|| {
                    detector.annotate(
                        black_box(occurrences.clone()),
                        Buffers { before: 5, after: 10 },
                        &tz,
                    )
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_generation_by_type,
    bench_generation_by_count,
    bench_conflict_annotation
);
criterion_main!(benches);
