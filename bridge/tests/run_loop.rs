use chess_codec::{Frame, FrameLayout, InboundFrame, MoveField};
use chess_link::sim::{SimLines, SimulatedPeer};
use chess_link::{BitLink, Level, LinkTiming, OutputLine};
use chessbridge::{run, GameCoordinator};
use cozy_chess::{Color, Move};
use engine::{parse_uci_move, EnginePair, MockEngine};
use tokio::sync::oneshot;

const LAYOUT: FrameLayout = FrameLayout::V1;

fn mv(s: &str) -> Move {
    parse_uci_move(s).unwrap()
}

fn payload(uci: &str) -> Frame {
    LAYOUT
        .encode_move(&MoveField::from_move(mv(uci)).unwrap())
        .unwrap()
}

fn move_frame(color: Color, uci: &str) -> Frame {
    InboundFrame::new(true, color, payload(uci))
        .to_frame()
        .unwrap()
}

fn setup_frame(color: Color, is_human: bool, difficulty: u32) -> Frame {
    let setup = LAYOUT.encode_setup(is_human, difficulty).unwrap();
    InboundFrame::new(false, color, setup).to_frame().unwrap()
}

fn bridge(black: MockEngine) -> (SimLines, BitLink<SimLines>, GameCoordinator<MockEngine>) {
    let lines = SimLines::new();
    let link = BitLink::new(lines.clone(), LinkTiming::default());
    let pair = EnginePair::new(MockEngine::new(), black);
    (lines, link, GameCoordinator::new(LAYOUT, pair))
}

#[tokio::test(start_paused = true)]
async fn test_board_session_against_computer() {
    let black = MockEngine::new().with_best_moves([mv("e7e5")]);
    let (lines, mut link, mut coordinator) = bridge(black.clone());
    let peer = SimulatedPeer::new(lines.clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let board = async {
        peer.acknowledge_preamble(4).await;
        peer.send(setup_frame(Color::White, true, 0)).await.unwrap();
        peer.send(setup_frame(Color::Black, false, 3)).await.unwrap();
        peer.send(move_frame(Color::White, "e2e4")).await.unwrap();
        let reply = peer.receive(LAYOUT.outbound_width()).await.unwrap();
        let _ = stop_tx.send(());
        reply
    };
    let served = run(&mut link, &mut coordinator, async {
        let _ = stop_rx.await;
    });

    let (result, reply) = tokio::join!(served, board);
    result.unwrap();

    assert_eq!(reply, payload("e7e5"));
    assert_eq!(coordinator.state().is_computer, [false, true]);
    assert_eq!(coordinator.state().turn, Color::White);
    assert_eq!(black.skill(), Some(3));
    assert_eq!(black.position(), vec![mv("e2e4"), mv("e7e5")]);
}

#[tokio::test(start_paused = true)]
async fn test_bad_frame_does_not_stop_the_loop() {
    let (lines, mut link, mut coordinator) = bridge(MockEngine::new());
    let peer = SimulatedPeer::new(lines.clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let board = async {
        peer.acknowledge_preamble(4).await;
        peer.send(move_frame(Color::White, "e2e5")).await.unwrap();
        peer.send(move_frame(Color::White, "e2e4")).await.unwrap();
        // Let the bridge act on the last frame before stopping.
        peer.idle_cycles(2).await;
        let _ = stop_tx.send(());
    };
    let served = run(&mut link, &mut coordinator, async {
        let _ = stop_rx.await;
    });

    let (result, ()) = tokio::join!(served, board);
    result.unwrap();

    assert_eq!(coordinator.engines().history(), [mv("e2e4")].as_slice());
    assert_eq!(coordinator.state().turn, Color::Black);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_lines() {
    let (lines, mut link, mut coordinator) = bridge(MockEngine::new());

    // Nobody answers the preamble; only shutdown ends the run.
    let stop = tokio::time::sleep(std::time::Duration::from_millis(55));
    run(&mut link, &mut coordinator, stop).await.unwrap();
    assert!(!link.state().brought_up);

    drop(link);
    for line in OutputLine::ALL {
        assert_eq!(lines.output(line), Level::Low);
    }
}
