use std::sync::Arc;

use courier::{
    msg, pattern, scheduler, spawn_linked, Actor, CourierError, Message, Reply, TypeTag,
};
use tokio::time::Duration;

/// How long a supervisor waits for work that should never complete.
const SUPERVISOR_PATIENCE: Duration = Duration::from_secs(5);

/// A worker servicing its actor's mailbox: doubles numbers, fails loudly on
/// an ``("explode", reason)`` message.
async fn doubling_worker(actor: Arc<Actor>) -> Result<(), CourierError> {
    loop {
        let mut recv = actor.receive();
        while let Some(matcher) = recv.next().await {
            if matcher.matches(&pattern!["double", TypeTag::Int]) {
                let [Message::Int(value)] = matcher.captured() else {
                    panic!("Captured value should be an integer.");
                };
                let doubled = value * 2;
                matcher.respond(doubled)?;
                break;
            }
            if matcher.matches(&pattern!["explode", TypeTag::Str]) {
                let [Message::Str(reason)] = matcher.captured() else {
                    panic!("Captured value should be a string.");
                };
                return Err(CourierError::TaskExecutionError(reason.clone()));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_worker_fault_tears_down_its_supervisor() {
    let actor = Actor::new_arc("doubler");

    let supervisor = scheduler::spawn("supervisor", {
        let actor = Arc::clone(&actor);
        async move {
            let worker = spawn_linked("doubler-worker", doubling_worker(actor))?;

            // The worker is healthy while it serves ordinary requests.
            tokio::time::sleep(SUPERVISOR_PATIENCE).await;
            worker.join().await
        }
    });

    // The worker answers normally first; the link stays quiet.
    assert_eq!(
        actor
            .send_with_reply(msg!["double", 21])
            .wait_for(Duration::from_secs(2))
            .await
            .expect("Reply should arrive in time."),
        Reply::Value(Message::Int(42))
    );

    // Then it faults, and the supervisor is torn down mid-sleep.
    actor.send(msg!["explode", "device unplugged"]);

    let result = supervisor.join().await;
    let Err(CourierError::Linked(failure)) = result else {
        panic!("Expected a linked failure, got {:?}.", result);
    };
    assert_eq!(failure.source_name, "doubler-worker");
    assert_eq!(failure.kind, "TaskExecutionError");
    assert!(failure.message.contains("device unplugged"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_clean_worker_exit_leaves_the_supervisor_alone() {
    let supervisor = scheduler::spawn("supervisor", async {
        let worker = spawn_linked("short-lived", async { Ok(()) })?;
        worker.join().await?;

        // Outlive the watcher's observation of the clean exit.
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok("unbothered")
    });

    assert_eq!(
        supervisor.join().await.expect("Supervisor should survive."),
        "unbothered"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_cascade_through_chained_links() {
    // grandparent -> parent -> child: the child's fault reaches the
    // grandparent through the parent's own linked failure.
    let grandparent = scheduler::spawn("grandparent", async {
        spawn_linked("parent", async {
            spawn_linked::<(), _>("child", async {
                Err(CourierError::TaskExecutionError("root cause".to_owned()))
            })?;
            tokio::time::sleep(SUPERVISOR_PATIENCE).await;
            Ok(())
        })?;
        tokio::time::sleep(SUPERVISOR_PATIENCE).await;
        Ok(())
    });

    let result = grandparent.join().await;
    let Err(CourierError::Linked(failure)) = result else {
        panic!("Expected a linked failure, got {:?}.", result);
    };
    assert_eq!(failure.source_name, "parent");
    assert_eq!(failure.kind, "Linked");
    assert!(failure.message.contains("root cause"));
}
