//! Integration tests for handler selection, named lookup, resolve-all and
//! cycle handling

use std::sync::{Arc, Weak};

use elif_kernel::{
    Arguments, ComponentDescriptor, CreationContext, HandlerState, Kernel, KernelError,
    KernelResult, ServiceType,
};
use serde_json::Value;

trait AlarmSender: Send + Sync {
    fn name(&self) -> String;
}

struct EmailSender;

impl AlarmSender for EmailSender {
    fn name(&self) -> String {
        "email".to_string()
    }
}

struct SmsSender;

impl AlarmSender for SmsSender {
    fn name(&self) -> String {
        "sms".to_string()
    }
}

/// Fans an alarm out to every other registered sender
struct BroadcastSender {
    targets: Vec<Arc<dyn AlarmSender>>,
}

impl AlarmSender for BroadcastSender {
    fn name(&self) -> String {
        format!("broadcast({})", self.targets.len())
    }
}

struct AlarmGenerator {
    sender: Arc<dyn AlarmSender>,
}

fn sender_service() -> ServiceType {
    ServiceType::of::<dyn AlarmSender>()
}

fn as_sender(instance: &elif_kernel::Instance) -> Arc<dyn AlarmSender> {
    instance
        .downcast_ref::<Arc<dyn AlarmSender>>()
        .cloned()
        .expect("sender instances are stored as Arc<dyn AlarmSender>")
}

fn register_email(kernel: &Kernel) {
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn AlarmSender>()
                .named("email")
                .with_factory(|_| Ok(Arc::new(EmailSender) as Arc<dyn AlarmSender>))
                .build()
                .unwrap(),
        )
        .unwrap();
}

fn register_sms(kernel: &Kernel) {
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn AlarmSender>()
                .named("sms")
                .with_factory(|_| Ok(Arc::new(SmsSender) as Arc<dyn AlarmSender>))
                .build()
                .unwrap(),
        )
        .unwrap();
}

fn register_generator(kernel: &Kernel) {
    kernel
        .register(
            ComponentDescriptor::for_service::<AlarmGenerator>()
                .depends_on::<dyn AlarmSender>()
                .with_factory(|ctx: &mut CreationContext| {
                    Ok(AlarmGenerator {
                        sender: ctx.resolve_trait::<dyn AlarmSender>()?,
                    })
                })
                .transient()
                .build()
                .unwrap(),
        )
        .unwrap();
}

#[test]
fn test_first_registered_wins_email_then_sms() {
    let kernel = Kernel::new();
    register_generator(&kernel);
    register_email(&kernel);
    register_sms(&kernel);

    let generator = kernel.resolve_as::<AlarmGenerator>().unwrap();
    assert_eq!(generator.sender.name(), "email");
    assert_eq!(kernel.resolve_trait::<dyn AlarmSender>().unwrap().name(), "email");
}

#[test]
fn test_first_registered_wins_sms_then_email() {
    let kernel = Kernel::new();
    register_sms(&kernel);
    register_email(&kernel);
    register_generator(&kernel);

    assert_eq!(kernel.resolve_trait::<dyn AlarmSender>().unwrap().name(), "sms");
    let generator = kernel.resolve_as::<AlarmGenerator>().unwrap();
    assert_eq!(generator.sender.name(), "sms");
}

#[test]
fn test_resolve_named() {
    let kernel = Kernel::new();
    register_email(&kernel);
    register_sms(&kernel);

    let sms = kernel
        .resolve_named("sms", Some(&sender_service()), Arguments::new())
        .unwrap();
    assert_eq!(as_sender(&sms).name(), "sms");

    let err = kernel
        .resolve_named("sms", Some(&ServiceType::of::<String>()), Arguments::new())
        .unwrap_err();
    assert!(err.is_not_found());

    let err = kernel.resolve_named("fax", None, Arguments::new()).unwrap_err();
    assert!(err.is_not_found());

    let err = kernel.resolve_named("  ", None, Arguments::new()).unwrap_err();
    assert!(err.is_invalid_argument());

    let err = kernel.resolve_named_as::<String>("sms").unwrap_err();
    assert!(matches!(err, KernelError::InvalidCast { .. }));
}

#[test]
fn test_resolve_unknown_service() {
    let kernel = Kernel::new();
    let err = kernel.resolve(&sender_service()).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("AlarmSender"));
}

#[test]
fn test_resolve_by_implementation_type() {
    trait TimeSource: Send + Sync {}

    #[derive(Default)]
    struct Clock;

    impl TimeSource for Clock {}

    let kernel = Kernel::new();
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn TimeSource>()
                .named("clock")
                .implemented_by::<Clock>()
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(kernel.resolve_as::<Clock>().is_ok());
}

#[test]
fn test_resolve_all_in_registration_order() {
    let kernel = Kernel::new();
    register_sms(&kernel);
    register_email(&kernel);

    let names: Vec<_> = kernel
        .resolve_all(&sender_service())
        .unwrap()
        .iter()
        .map(|i| as_sender(i).name())
        .collect();
    assert_eq!(names, vec!["sms", "email"]);

    assert!(kernel
        .resolve_all(&ServiceType::of::<String>())
        .unwrap()
        .is_empty());
}

#[test]
fn test_resolve_all_skips_unsatisfiable_candidates() {
    let kernel = Kernel::new();
    register_email(&kernel);
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn AlarmSender>()
                .named("pager")
                .depends_on_key("pager-gateway")
                .with_factory(|_| Ok(Arc::new(SmsSender) as Arc<dyn AlarmSender>))
                .build()
                .unwrap(),
        )
        .unwrap();
    register_sms(&kernel);

    let pager = kernel.handler("pager").unwrap();
    assert!(matches!(pager.state(), HandlerState::WaitingDependency(ref m) if m.len() == 1));

    let all = kernel.resolve_all(&sender_service()).unwrap();
    assert_eq!(all.len(), 2);

    let err = kernel
        .resolve_named("pager", None, Arguments::new())
        .unwrap_err();
    assert!(matches!(err, KernelError::DependencyResolutionFailed { .. }));
    assert!(err.to_string().contains("pager-gateway"));
}

#[test]
fn test_resolve_all_propagates_activation_errors() {
    let kernel = Kernel::new();
    register_email(&kernel);
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn AlarmSender>()
                .named("broken")
                .with_factory(|_| -> KernelResult<Arc<dyn AlarmSender>> {
                    Err(KernelError::activation("broken", "gateway offline"))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = kernel.resolve_all(&sender_service()).unwrap_err();
    assert!(matches!(err, KernelError::Activation { .. }));
}

#[test]
fn test_resolve_all_excludes_component_in_progress() {
    let kernel = Kernel::new();
    register_email(&kernel);
    kernel
        .register(
            ComponentDescriptor::for_service::<dyn AlarmSender>()
                .named("broadcast")
                .with_factory(|ctx: &mut CreationContext| {
                    let targets = ctx
                        .resolve_all(&ServiceType::of::<dyn AlarmSender>())?
                        .iter()
                        .map(as_sender)
                        .collect();
                    Ok(Arc::new(BroadcastSender { targets }) as Arc<dyn AlarmSender>)
                })
                .transient()
                .build()
                .unwrap(),
        )
        .unwrap();
    register_sms(&kernel);

    let names: Vec<_> = kernel
        .resolve_all(&sender_service())
        .unwrap()
        .iter()
        .map(|i| as_sender(i).name())
        .collect();
    assert_eq!(names, vec!["email", "broadcast(2)", "sms"]);
}

struct Parent {
    child: once_cell::sync::OnceCell<Arc<Child>>,
}

struct Child {
    parent: Weak<Parent>,
}

#[test]
fn test_singleton_back_reference_sees_instance_in_progress() {
    let kernel = Kernel::new();
    kernel
        .register(
            ComponentDescriptor::for_service::<Parent>()
                .with_arc_factory(|ctx: &mut CreationContext| {
                    let parent = Arc::new(Parent {
                        child: once_cell::sync::OnceCell::new(),
                    });
                    ctx.set_in_progress(parent.clone());
                    let child = ctx.resolve_as::<Child>()?;
                    let _ = parent.child.set(child);
                    Ok(parent)
                })
                .singleton()
                .build()
                .unwrap(),
        )
        .unwrap();
    kernel
        .register(
            ComponentDescriptor::for_service::<Child>()
                .with_factory(|ctx: &mut CreationContext| {
                    let parent = ctx.resolve_as::<Parent>()?;
                    Ok(Child {
                        parent: Arc::downgrade(&parent),
                    })
                })
                .transient()
                .build()
                .unwrap(),
        )
        .unwrap();

    let parent = kernel.resolve_as::<Parent>().unwrap();
    let child = parent.child.get().unwrap();
    assert!(Arc::ptr_eq(&child.parent.upgrade().unwrap(), &parent));
    assert!(Arc::ptr_eq(&kernel.resolve_as::<Parent>().unwrap(), &parent));
}

#[derive(Debug)]
struct Left;
#[derive(Debug)]
struct Right;

#[test]
fn test_cycle_between_singletons_is_reported() {
    let kernel = Kernel::new();
    kernel
        .register(
            ComponentDescriptor::for_service::<Left>()
                .named("left")
                .with_factory(|ctx: &mut CreationContext| {
                    ctx.resolve_as::<Right>()?;
                    Ok(Left)
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    kernel
        .register(
            ComponentDescriptor::for_service::<Right>()
                .named("right")
                .with_factory(|ctx: &mut CreationContext| {
                    ctx.resolve_as::<Left>()?;
                    Ok(Right)
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = kernel.resolve_as::<Left>().unwrap_err();
    match err {
        KernelError::CircularDependency { path, component } => {
            assert_eq!(path, "left -> right -> left");
            assert_eq!(component, "left");
        }
        other => panic!("expected a circular dependency, got {:?}", other),
    }

    // Nothing was cached by the failed attempt
    assert!(kernel.resolve_as::<Right>().unwrap_err().is_circular());
}

#[test]
fn test_transient_self_dependency_is_reported() {
    #[derive(Debug)]
    struct Recursive;

    let kernel = Kernel::new();
    kernel
        .register(
            ComponentDescriptor::for_service::<Recursive>()
                .named("recursive")
                .with_factory(|ctx: &mut CreationContext| {
                    ctx.resolve_named("recursive", None)?;
                    Ok(Recursive)
                })
                .transient()
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = kernel.resolve_as::<Recursive>().unwrap_err();
    assert!(err.is_circular());
    assert_eq!(kernel.tracked_count(), 0);
}

#[derive(Debug, PartialEq)]
struct Smtp {
    host: String,
    port: u16,
}

#[test]
fn test_arguments_override_parameters() {
    let kernel = Kernel::new();
    kernel
        .register(
            ComponentDescriptor::for_service::<Smtp>()
                .parameter("host", "localhost")
                .parameter("port", 25)
                .with_factory(|ctx: &mut CreationContext| {
                    Ok(Smtp {
                        host: ctx.parameter_as::<String>("host")?.unwrap_or_default(),
                        port: ctx.parameter_as::<u16>("port")?.unwrap_or(587),
                    })
                })
                .transient()
                .build()
                .unwrap(),
        )
        .unwrap();

    let smtp = kernel.resolve_as::<Smtp>().unwrap();
    assert_eq!(*smtp, Smtp { host: "localhost".into(), port: 25 });

    let instance = kernel
        .resolve_with_args(
            &ServiceType::of::<Smtp>(),
            Arguments::new().with("port", Value::from(2525)),
        )
        .unwrap();
    let smtp = instance.downcast::<Smtp>().unwrap();
    assert_eq!(smtp.port, 2525);
    assert_eq!(smtp.host, "localhost");
}

#[test]
fn test_registration_errors() {
    let kernel = Kernel::new();
    register_email(&kernel);

    let duplicate = ComponentDescriptor::for_service::<dyn AlarmSender>()
        .named("email")
        .with_factory(|_| Ok(Arc::new(SmsSender) as Arc<dyn AlarmSender>))
        .build()
        .unwrap();
    let err = kernel.register(duplicate).unwrap_err();
    assert!(matches!(err, KernelError::ComponentRegistration { .. }));

    assert_eq!(kernel.component_count(), 1);
    assert!(kernel.has_component("email"));
    assert_eq!(kernel.handlers_for(&sender_service()).len(), 1);
}

#[test]
fn test_late_registration_validates_waiting_handler() {
    let kernel = Kernel::new();
    register_generator(&kernel);

    let generator = kernel.handler(std::any::type_name::<AlarmGenerator>()).unwrap();
    assert!(!generator.is_valid());
    assert!(kernel.resolve_as::<AlarmGenerator>().is_err());

    register_email(&kernel);
    assert!(generator.is_valid());
    assert_eq!(
        kernel.resolve_as::<AlarmGenerator>().unwrap().sender.name(),
        "email"
    );
}
