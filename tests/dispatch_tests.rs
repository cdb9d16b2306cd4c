//! Worker pool tests over a context with the default modules.

use std::sync::Arc;

use sysbind::{Context, DispatchError, MarshalConfig, WorkerPool};
use sysbind_core::{
    ErrorKind, HostSequence, HostTable, HostValue, MarshalResult, NativeRecord,
    TrackingAllocator,
};
use sysbind_modules::{PollFd, Rlimit};
use sysbind_registry::{LiveRegistry, TypeDescriptor, TypeRegistry};

fn sealed(config: MarshalConfig) -> Context {
    let mut ctx = Context::with_config(config);
    for module in sysbind_modules::default_modules() {
        ctx.install(module).unwrap();
    }
    ctx.seal().unwrap();
    ctx
}

#[test]
fn workers_share_the_registry() {
    let ctx = sealed(MarshalConfig::new());
    let mut pool = ctx.create_pool(4).unwrap();
    assert_eq!(pool.size(), 4);

    let handles: Vec<_> = (0..32)
        .map(|fd| {
            pool.submit(move |m| -> MarshalResult<PollFd> {
                let table = HostTable::new().with("fd", fd).with("events", 1);
                let input = HostValue::from(HostSequence::from(vec![HostValue::Table(table)]));
                let array = m.sequence_to_array(PollFd::CODE, &input, Some(1))?;
                Ok(array.to_records::<PollFd>()?[0])
            })
            .unwrap()
        })
        .collect();

    for (fd, handle) in handles.into_iter().enumerate() {
        let record = handle.wait().unwrap().unwrap();
        assert_eq!(record.fd, fd as i32);
        assert_eq!(record.events, 1);
    }
    pool.shutdown();
}

#[test]
fn arrays_move_between_threads() {
    let ctx = sealed(MarshalConfig::new());
    let pool = ctx.create_pool(1).unwrap();

    let job = pool
        .submit(|m| {
            m.records_to_array(&[Rlimit {
                rlim_cur: 1024,
                rlim_max: 4096,
            }])
        })
        .unwrap();
    let array = job.wait().unwrap().unwrap();

    let mut local = ctx.create_marshaler().unwrap();
    let seq = local.array_into_sequence(Rlimit::CODE, array).unwrap();
    let handle = seq.get(1).and_then(HostValue::as_opaque).unwrap();
    assert_eq!(local.get_field(handle, "rlim_max").unwrap(), HostValue::Int(4096));
}

#[test]
fn shutdown_drains_pending_jobs() {
    let tracker = Arc::new(TrackingAllocator::new());
    let ctx = sealed(MarshalConfig::new().with_allocator(tracker.clone()));
    let mut pool = ctx.create_pool(2).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            pool.submit(|m| {
                let h = m.create_record(&Rlimit::default()).unwrap();
                m.destroy_value(h)
            })
            .unwrap()
        })
        .collect();
    pool.shutdown();

    for handle in handles {
        assert_eq!(handle.try_result(), Some(true));
    }
    assert!(matches!(pool.submit(|_| ()), Err(DispatchError::PoolClosed)));
    assert!(tracker.stats().is_balanced());
}

#[test]
fn types_registered_after_start_reach_workers() {
    let live = Arc::new(LiveRegistry::new(TypeRegistry::with_scalars()));
    let mut pool = WorkerPool::new(live.clone(), MarshalConfig::new(), 2);

    let convert = |m: &mut sysbind::Marshaler| -> MarshalResult<Rlimit> {
        let table = HostTable::new().with("rlim_cur", 8).with("rlim_max", 64);
        let input = HostValue::from(HostSequence::from(vec![HostValue::Table(table)]));
        let array = m.sequence_to_array(Rlimit::CODE, &input, Some(1))?;
        Ok(array.to_records::<Rlimit>()?[0])
    };

    let before = pool.submit(convert).unwrap().wait().unwrap();
    assert_eq!(before.unwrap_err().kind(), ErrorKind::UnknownType);

    live.register(TypeDescriptor::record::<Rlimit>().unwrap())
        .unwrap();
    let after = pool.submit(convert).unwrap().wait().unwrap().unwrap();
    assert_eq!(
        after,
        Rlimit {
            rlim_cur: 8,
            rlim_max: 64
        }
    );
    pool.shutdown();
}
