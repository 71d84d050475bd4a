//! Benchmarks for join planning and row hydration.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use relweave_query::{
    EntityCatalog, EntityDescriptor, Hydrator, JoinPlanner, JoinTableSpec, QueryConfig,
    QueryRequest, RelationSpec, Row, ScalarCodec, Value,
};
use std::hint::black_box;

fn catalog() -> EntityCatalog {
    EntityCatalog::builder()
        .entity(
            EntityDescriptor::new("User", "users")
                .column("id", ScalarCodec::Int)
                .column("name", ScalarCodec::Text)
                .relation(RelationSpec::has_many("posts", "Post", "author"))
                .relation(RelationSpec::belongs_to_many(
                    "roles",
                    "Role",
                    JoinTableSpec::new("user_roles", "user_id", "role_id"),
                )),
        )
        .entity(
            EntityDescriptor::new("Post", "posts")
                .column("id", ScalarCodec::Int)
                .column("author", ScalarCodec::Int)
                .column("title", ScalarCodec::Text),
        )
        .entity(
            EntityDescriptor::new("Role", "roles")
                .column("id", ScalarCodec::Int)
                .column("label", ScalarCodec::Text),
        )
        .build()
        .expect("valid catalog")
}

/// Rows for `users` users with `posts` posts each, ordered as the planner orders them.
fn user_post_rows(users: i64, posts: i64) -> Vec<Row> {
    let mut rows = Vec::with_capacity((users * posts) as usize);
    for user in 0..users {
        for post in 0..posts {
            rows.push(
                Row::new()
                    .with("usersid", user)
                    .with("usersname", format!("user{}", user))
                    .with("t1_id", user * posts + post)
                    .with("t1_author", user)
                    .with("t1_title", format!("post{}", post)),
            );
        }
    }
    rows
}

fn bench_planning(c: &mut Criterion) {
    let catalog = catalog();
    let config = QueryConfig::default();
    let mut group = c.benchmark_group("planning");

    group.bench_function("root_only", |b| {
        let request = QueryRequest::new("User");
        b.iter(|| black_box(JoinPlanner::new(&catalog, &config).plan(&request)))
    });

    group.bench_function("has_many_and_pivot", |b| {
        let request = QueryRequest::new("User").with("posts").with("roles");
        b.iter(|| black_box(JoinPlanner::new(&catalog, &config).plan(&request)))
    });

    group.finish();
}

fn bench_hydration(c: &mut Criterion) {
    let catalog = catalog();
    let config = QueryConfig::default();
    let plan = JoinPlanner::new(&catalog, &config)
        .plan(&QueryRequest::new("User").with("posts"))
        .expect("plan");
    let mut group = c.benchmark_group("hydration");

    for (users, posts) in [(10, 10), (100, 10), (1000, 5)] {
        let rows = user_post_rows(users, posts);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("user_posts", format!("{}x{}", users, posts)),
            &rows,
            |b, rows| b.iter(|| black_box(Hydrator::new(&plan, &config).hydrate(rows))),
        );
    }

    group.bench_function("root_without_children", |b| {
        let rows: Vec<Row> = (0..1000)
            .map(|i| {
                Row::new()
                    .with("usersid", i as i64)
                    .with("usersname", "x")
                    .with("t1_id", Value::Null)
                    .with("t1_author", Value::Null)
                    .with("t1_title", Value::Null)
            })
            .collect();
        b.iter(|| black_box(Hydrator::new(&plan, &config).hydrate(&rows)))
    });

    group.finish();
}

criterion_group!(benches, bench_planning, bench_hydration);
criterion_main!(benches);
