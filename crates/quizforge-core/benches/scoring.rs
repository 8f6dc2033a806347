use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizforge_core::model::{Difficulty, Question, RawAnswer};
use quizforge_core::scorer::{keyword_overlap, score};
use quizforge_core::validator::strip_tags;

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    let choice = Question::multiple_choice(
        "mc",
        "Largest planet?",
        vec!["Mars".into(), "Jupiter".into(), "Venus".into(), "Earth".into()],
        1,
        "astronomy",
        Difficulty::Easy,
    );
    let numeric = Question::numeric("n", "Speed of light in km/s?", 299_792.458).with_unit("km/s");
    let text = Question::text(
        "t",
        "What causes the seasons?",
        "the tilt of the earth's rotational axis relative to its orbital plane",
    )
    .with_possible_answers(vec!["axial tilt".into()]);

    let choice_answer = RawAnswer::Number(1.0);
    let near_miss = RawAnswer::Text("300000".into());
    let partial = RawAnswer::Text("the earth's axis is tilted".into());

    group.bench_function("multiple_choice", |b| {
        b.iter(|| score(black_box(Some(&choice_answer)), black_box(&choice)))
    });

    group.bench_function("numeric_partial", |b| {
        b.iter(|| score(black_box(Some(&near_miss)), black_box(&numeric)))
    });

    group.bench_function("text_keywords", |b| {
        b.iter(|| score(black_box(Some(&partial)), black_box(&text)))
    });

    group.finish();
}

fn bench_text_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_helpers");

    let long_answer = "the moon orbits the earth and the earth orbits the sun ".repeat(20);
    let tagged = "<p>The <b>tilt</b> of the <script>alert(1)</script>axis</p>".repeat(10);

    group.bench_function("keyword_overlap", |b| {
        b.iter(|| {
            keyword_overlap(
                black_box("the tilt of the earth's rotational axis"),
                black_box(&long_answer),
            )
        })
    });

    group.bench_function("strip_tags", |b| b.iter(|| strip_tags(black_box(&tagged))));

    group.finish();
}

criterion_group!(benches, bench_score, bench_text_helpers);
criterion_main!(benches);
