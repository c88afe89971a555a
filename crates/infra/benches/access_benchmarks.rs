use std::sync::Arc;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use guildhall_auth::{
    AccessSubject, AppKey, Argon2PasswordHasher, BypassTable, RoleKey, RoleSet, User, UserProfile, decide,
};
use guildhall_core::UserId;
use guildhall_infra::{Directory, GuildhallConfig, InMemoryDirectory, Services, in_transaction, seed};
use guildhall_membership::{
    Membership, MembershipTerms, Organisation, OrganisationType, TierCatalog, TierKey, unique_slug,
};

/// Seeded directory with `members` users, each holding MEMBER and an active membership.
fn populated(members: usize) -> (Arc<InMemoryDirectory>, Vec<UserId>) {
    let dir = Arc::new(InMemoryDirectory::new());
    seed(&dir, None, &Argon2PasswordHasher).unwrap();
    let ids = in_transaction(&dir, |tx| {
        let now = Utc::now();
        let org = Organisation::new("Bench Org", OrganisationType::Industry, unique_slug("Bench Org", |_| false), now)?;
        tx.insert_organisation(org.clone())?;
        let member_roles: RoleSet = [RoleKey::Member].into_iter().collect();
        let mut ids = Vec::with_capacity(members);
        for i in 0..members {
            let profile = UserProfile::new("Bench", &format!("User{i}"), &format!("bench{i}@guildhall.test"))?;
            let mut user = User::new(profile, String::new(), now);
            user.organisation_id = Some(org.id);
            let tier = TierKey::ALL[i % TierKey::ALL.len()];
            let user_id = user.id;
            tx.insert_user(user)?;
            tx.set_user_roles(user_id, &member_roles)?;
            tx.insert_membership(Membership::create(user_id, org.id, MembershipTerms::new(tier), now))?;
            ids.push(user_id);
        }
        Ok(ids)
    })
    .unwrap();
    (dir, ids)
}

fn bench_decide(c: &mut Criterion) {
    let dir = InMemoryDirectory::new();
    seed(&dir, None, &Argon2PasswordHasher).unwrap();
    let tx = dir.begin().unwrap();
    let app = tx.app(&AppKey::new(AppKey::TALENT_DISCOVERY)).unwrap();
    drop(tx);

    let tiers = TierCatalog::standard();
    let bypass = BypassTable::standard();
    let subject = AccessSubject {
        roles: [RoleKey::Member].into_iter().collect(),
        active_rank: tiers.rank(TierKey::Silver),
    };

    c.bench_function("decide/member_silver", |b| {
        b.iter(|| decide(black_box(&subject), black_box(app.as_ref()), &bypass, &tiers))
    });
}

fn bench_can_access_app(c: &mut Criterion) {
    let mut group = c.benchmark_group("can_access_app");
    let config = GuildhallConfig::default();

    for members in [10usize, 1_000] {
        let (dir, ids) = populated(members);
        let services = Services::new(dir, &config);
        let user = ids[ids.len() / 2];

        group.bench_with_input(BenchmarkId::new("members", members), &user, |b, user| {
            b.iter(|| services.access.can_access_app(black_box(*user), AppKey::IXN_WORKFLOW_MANAGER))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decide, bench_can_access_app);
criterion_main!(benches);
