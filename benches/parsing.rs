//! Benchmarks for line parsing, serialization and outbound line building.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slirc_tmi::command::outbound;
use slirc_tmi::transport::split_lines;
use slirc_tmi::Message;

const PING: &str = "PING :tmi.twitch.tv";

const JOIN: &str = ":nick!nick@nick.tmi.twitch.tv JOIN #room";

/// Chat message as delivered with the tags capability.
const PRIVMSG: &str = "@badge-info=;badges=moderator/1,subscriber/12;color=#1E90FF;display-name=Nick;emotes=25:0-4;first-msg=0;flags=;id=b34ccfc7-4977-403a-8a94-33c6bac34fb8;mod=1;room-id=1337;subscriber=1;tmi-sent-ts=1600000000000;turbo=0;user-id=42;user-type=mod :nick!nick@nick.tmi.twitch.tv PRIVMSG #room :Kappa hello chat";

/// Room event with escaped tag values.
const USERNOTICE: &str = "@badge-info=subscriber/5;badges=subscriber/3;color=;display-name=Raider;emotes=;id=3d830f12-795c-447d-af3c-ea05e40fbddb;login=raider;mod=0;msg-id=raid;msg-param-displayName=Raider;msg-param-login=raider;msg-param-viewerCount=15;room-id=1337;subscriber=1;system-msg=15\\sraiders\\sfrom\\sRaider\\shave\\sjoined!;tmi-sent-ts=1600000000000;user-id=42;user-type= :tmi.twitch.tv USERNOTICE #room";

const NAMES: &str = ":nick.tmi.twitch.tv 353 nick = #room :alpha beta gamma delta epsilon";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Parsing");

    for (name, line) in [
        ("ping", PING),
        ("join", JOIN),
        ("privmsg", PRIVMSG),
        ("usernotice", USERNOTICE),
        ("names", NAMES),
    ] {
        group.bench_with_input(BenchmarkId::new("parse", name), line, |b, s| {
            b.iter(|| {
                let msg = Message::parse(black_box(s)).unwrap();
                black_box(msg)
            })
        });
    }

    group.finish();
}

fn benchmark_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame Splitting");

    let frame: String = [PRIVMSG, JOIN, USERNOTICE, PING]
        .iter()
        .map(|line| format!("{}\r\n", line))
        .collect();

    group.bench_function("split_and_parse", |b| {
        b.iter(|| {
            let parsed: Vec<Message> = split_lines(black_box(&frame))
                .filter_map(|line| Message::parse(line).ok())
                .collect();
            black_box(parsed)
        })
    });

    group.finish();
}

fn benchmark_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Serialization");

    let privmsg = Message::parse(PRIVMSG).unwrap();
    let usernotice = Message::parse(USERNOTICE).unwrap();

    group.bench_function("privmsg", |b| {
        b.iter(|| {
            let s = black_box(&privmsg).to_string();
            black_box(s)
        })
    });

    group.bench_function("usernotice", |b| {
        b.iter(|| {
            let s = black_box(&usernotice).to_string();
            black_box(s)
        })
    });

    group.finish();
}

fn benchmark_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("Outbound Lines");

    group.bench_function("privmsg", |b| {
        b.iter(|| {
            let line = outbound::privmsg(black_box("#Room"), black_box("hello\r\nworld"));
            black_box(line)
        })
    });

    group.bench_function("login", |b| {
        b.iter(|| {
            let lines = outbound::login(black_box("mybot"), black_box("oauth:abcdef"));
            black_box(lines)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_frames,
    benchmark_serialization,
    benchmark_outbound,
);

criterion_main!(benches);
