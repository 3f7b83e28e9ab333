use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Observer as _, Split as _};
use tui_player::output::push_capture;

#[test]
fn stereo_frames_pass_through() {
    let (mut prod, mut cons) = HeapRb::<f32>::new(16).split();
    push_capture(&[0.1f32, 0.2, 0.3, 0.4], 2, 2, &mut prod);

    let mut got = vec![0.0f32; 4];
    assert_eq!(cons.pop_slice(&mut got), 4);
    assert_eq!(got, vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn extra_channels_are_stripped_per_frame() {
    // Quad source, keep the front pair of each frame.
    let data = [0.1f32, 0.2, 9.0, 9.0, 0.3, 0.4, 9.0, 9.0];
    let (mut prod, mut cons) = HeapRb::<f32>::new(16).split();
    push_capture(&data, 4, 2, &mut prod);

    let mut got = vec![0.0f32; 4];
    assert_eq!(cons.pop_slice(&mut got), 4);
    assert_eq!(got, vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn integer_samples_are_converted_to_float() {
    let (mut prod, mut cons) = HeapRb::<f32>::new(4).split();
    push_capture(&[i16::MAX, 0i16], 1, 1, &mut prod);

    let a = cons.try_pop().unwrap();
    let b = cons.try_pop().unwrap();
    assert!((a - 1.0).abs() < 1e-3);
    assert_eq!(b, 0.0);
}

#[test]
fn full_ring_drops_whole_frames() {
    // Capacity 3 holds one stereo frame plus a single orphan slot; the
    // second frame must be dropped entirely, not split.
    let (mut prod, mut cons) = HeapRb::<f32>::new(3).split();
    push_capture(&[0.1f32, 0.2, 0.3, 0.4], 2, 2, &mut prod);
    assert_eq!(cons.occupied_len(), 2);

    let mut got = vec![0.0f32; 2];
    cons.pop_slice(&mut got);
    assert_eq!(got, vec![0.1, 0.2]);

    // With the ring drained the next frame starts on a frame boundary,
    // so left samples stay in left positions.
    push_capture(&[0.5f32, 0.6], 2, 2, &mut prod);
    cons.pop_slice(&mut got);
    assert_eq!(got, vec![0.5, 0.6]);
}

#[test]
fn pairing_survives_a_drop_window() {
    let (mut prod, mut cons) = HeapRb::<f32>::new(4).split();

    // Three frames into a four-slot ring: the third is dropped whole.
    push_capture(&[1.0f32, -1.0, 2.0, -2.0, 3.0, -3.0], 2, 2, &mut prod);
    assert_eq!(cons.occupied_len(), 4);
    push_capture(&[4.0f32, -4.0], 2, 2, &mut prod);
    assert_eq!(cons.occupied_len(), 4);

    let mut got = vec![0.0f32; 4];
    cons.pop_slice(&mut got);
    // Every even index is a left sample, every odd a right one.
    assert_eq!(got, vec![1.0, -1.0, 2.0, -2.0]);

    push_capture(&[5.0f32, -5.0], 2, 2, &mut prod);
    cons.pop_slice(&mut got[..2]);
    assert_eq!(&got[..2], &[5.0, -5.0]);
}
