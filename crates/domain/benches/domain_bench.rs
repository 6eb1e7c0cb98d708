use common::{TenantId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, AddTag, CallerContext, ContactDetails, Customer, CustomerDetails, CustomerService,
    CustomerType, NewContact, PipelineConfig, RegisterCustomer, SideEffects, UpdateCustomer,
};
use store::InMemoryStore;

fn service() -> CustomerService<InMemoryStore> {
    CustomerService::new(
        InMemoryStore::new(),
        SideEffects::in_memory(),
        PipelineConfig::default(),
    )
}

fn ctx() -> CallerContext {
    CallerContext::new(TenantId::new(), UserId::new())
}

fn bench_register_customer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = service();
    let ctx = ctx();

    c.bench_function("domain/register_customer", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = RegisterCustomer::new("Bench Corp", CustomerType::Company);
                service.register_customer(&ctx, cmd).await.unwrap();
            });
        });
    });
}

fn bench_update_customer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = service();
    let ctx = ctx();
    let created = rt.block_on(async {
        let cmd = RegisterCustomer::new("Bench Corp", CustomerType::Company);
        service.register_customer(&ctx, cmd).await.unwrap()
    });
    let id = created.aggregate.id();
    let mut version = created.new_version;

    c.bench_function("domain/update_customer", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = UpdateCustomer::new(id, version, CustomerDetails::new("Bench Inc"));
                version = service.update_customer(&ctx, cmd).await.unwrap().new_version;
            });
        });
    });
}

fn bench_no_op_mutation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = service();
    let ctx = ctx();
    let (id, version) = rt.block_on(async {
        let cmd = RegisterCustomer {
            tags: vec!["vip".to_string()],
            ..RegisterCustomer::new("Bench Corp", CustomerType::Company)
        };
        let created = service.register_customer(&ctx, cmd).await.unwrap();
        (created.aggregate.id(), created.new_version)
    });

    c.bench_function("domain/add_existing_tag", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = AddTag {
                    customer_id: id,
                    expected_version: version,
                    tag: "vip".to_string(),
                };
                service.add_tag(&ctx, cmd).await.unwrap();
            });
        });
    });
}

fn bench_decide_and_apply(c: &mut Criterion) {
    let (customer, _) = Customer::builder(TenantId::new(), UserId::new())
        .name("Bench Corp")
        .build()
        .unwrap();

    c.bench_function("domain/add_contact_decide_apply", |b| {
        b.iter(|| {
            let mut next = customer.clone();
            let contact = NewContact::new(ContactDetails::new("Ada").with_email("ada@bench.io"));
            let events = next.add_contact(&contact, 100).unwrap();
            next.apply_events(events);
        });
    });
}

criterion_group!(
    benches,
    bench_register_customer,
    bench_update_customer,
    bench_no_op_mutation,
    bench_decide_and_apply
);
criterion_main!(benches);
